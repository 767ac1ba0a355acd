//! End-to-end lowering scenarios over the semantic lifter.

use rstest::rstest;

use rift_ir::{BasicBlock, Constant, Opcode, Operand, Type, NO_LABEL};
use rift_x86::{lift, MachInsn, MemRef, Mnemonic, Reg, SemaError, AMD64};

fn lifted(insn: MachInsn) -> BasicBlock {
    let mut bb = BasicBlock::new();
    lift(&AMD64, &insn, &mut bb).expect("lift failed");
    bb
}

fn opcodes(bb: &BasicBlock) -> Vec<Opcode> {
    bb.insns().map(|id| bb.insn(id).opcode()).collect()
}

/// Register named by a `read_reg`/`write_reg` constant operand.
fn reg_of(bb: &BasicBlock, id: rift_ir::InsnId) -> Option<Reg> {
    use strum::IntoEnumIterator;
    let mreg = bb.insn(id).operand(0).as_const()?.as_reg()?;
    Reg::iter().find(|r| r.mreg() == mreg)
}

#[test]
fn nop_emits_nothing() {
    let bb = lifted(MachInsn::new(Mnemonic::Nop, []));
    assert!(bb.is_empty());
}

#[test]
fn mov_same_register_emits_nothing() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Mov,
        [Reg::Eax.into(), Reg::Eax.into()],
    ));
    assert!(bb.is_empty());
}

#[test]
fn mov_transfers_at_effective_width() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Mov,
        [Reg::Eax.into(), Reg::Ecx.into()],
    ));
    assert_eq!(opcodes(&bb), vec![Opcode::ReadReg, Opcode::WriteReg]);
    let read = bb.insns().next().unwrap();
    assert_eq!(bb.insn(read).result_type(), Type::I32);
    assert_eq!(reg_of(&bb, read), Some(Reg::Ecx));
}

#[test]
fn xor_self_is_the_zero_idiom() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Xor,
        [Reg::Eax.into(), Reg::Eax.into()],
    ));
    let ids: Vec<_> = bb.insns().collect();
    assert_eq!(ids.len(), 7);
    assert!(ids.iter().all(|&id| bb.insn(id).opcode() == Opcode::WriteReg));

    let targets: Vec<_> = ids.iter().map(|&id| reg_of(&bb, id).unwrap()).collect();
    assert_eq!(
        targets,
        vec![Reg::Sf, Reg::Zf, Reg::Pf, Reg::Of, Reg::Cf, Reg::Af, Reg::Eax]
    );
    let values: Vec<_> = ids
        .iter()
        .map(|&id| bb.insn(id).operand(1).as_const().unwrap().clone())
        .collect();
    assert_eq!(
        values[..6],
        [
            Constant::bool(false),
            Constant::bool(true),
            Constant::bool(true),
            Constant::bool(false),
            Constant::bool(false),
            Constant::bool(false),
        ]
    );
    assert_eq!(values[6], Constant::int(Type::I32, 0));
}

#[test]
fn push_pop_round_trip_balances_sp() {
    let mut bb = BasicBlock::new();
    lift(
        &AMD64,
        &MachInsn::new(Mnemonic::Push, [Reg::Rax.into()]),
        &mut bb,
    )
    .unwrap();
    lift(
        &AMD64,
        &MachInsn::new(Mnemonic::Pop, [Reg::Rax.into()]),
        &mut bb,
    )
    .unwrap();

    let ids: Vec<_> = bb.insns().collect();

    // SP deltas cancel: one sub and one add, both by the pointer width.
    let deltas: Vec<_> = ids
        .iter()
        .filter(|&&id| bb.insn(id).opcode() == Opcode::Binop)
        .map(|&id| {
            let insn = bb.insn(id);
            let op = insn.operand(0).as_const().unwrap().as_op().unwrap();
            let amount = insn.operand(2).as_const().unwrap().as_i64();
            (op, amount)
        })
        .collect();
    assert_eq!(
        deltas,
        vec![(rift_ir::Op::Sub, 8), (rift_ir::Op::Add, 8)]
    );

    // The stored value and the loaded value agree in type and width.
    let store = ids
        .iter()
        .find(|&&id| bb.insn(id).opcode() == Opcode::StoreMem)
        .unwrap();
    let load = ids
        .iter()
        .find(|&&id| bb.insn(id).opcode() == Opcode::LoadMem)
        .unwrap();
    let stored = bb.insn(*store).operand(2).clone();
    let stored_ty = bb.operand_type(&stored);
    assert_eq!(stored_ty, Type::I64);
    assert_eq!(bb.insn(*load).result_type(), Type::I64);

    // The stored value is the RAX read; the POP load lands back in RAX.
    let src = stored.as_insn().unwrap();
    assert_eq!(bb.insn(src).opcode(), Opcode::ReadReg);
    assert_eq!(reg_of(&bb, src), Some(Reg::Rax));

    // POP reads memory before bumping SP.
    let load_pos = ids.iter().position(|i| i == load).unwrap();
    let add_pos = ids
        .iter()
        .position(|&id| {
            bb.insn(id).opcode() == Opcode::Binop
                && bb.insn(id).operand(0).as_const().unwrap().as_op()
                    == Some(rift_ir::Op::Add)
        })
        .unwrap();
    assert!(load_pos < add_pos);
}

#[rstest]
#[case::movzx(Mnemonic::Movzx, Opcode::Cast)]
#[case::movsx(Mnemonic::Movsx, Opcode::CastSx)]
#[case::movsxd(Mnemonic::Movsxd, Opcode::CastSx)]
fn widening_moves_extend_to_destination_width(
    #[case] mnemonic: Mnemonic,
    #[case] cast: Opcode,
) {
    let bb = lifted(MachInsn::new(
        mnemonic,
        [Reg::Eax.into(), Reg::Al.into()],
    ));
    assert_eq!(opcodes(&bb), vec![Opcode::ReadReg, cast, Opcode::WriteReg]);
    let widen = bb.insns().nth(1).unwrap();
    // Source width in, destination width out.
    assert_eq!(bb.insn(widen).template(), &[Type::I8, Type::I32]);
    assert_eq!(bb.insn(widen).result_type(), Type::I32);
}

#[test]
fn lea_same_base_identity_emits_nothing() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Lea,
        [Reg::Rax.into(), MemRef::base(Reg::Rax, 64).into()],
    ));
    assert!(bb.is_empty());
}

#[test]
fn lea_computes_the_effective_address() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Lea,
        [
            Reg::Rax.into(),
            MemRef::base(Reg::Rbx, 64).with_index(Reg::Rcx, 4).with_disp(8).into(),
        ],
    ));
    let ops = opcodes(&bb);
    // base + index*scale + disp, cast to pointer, written back; no load.
    assert!(!ops.contains(&Opcode::LoadMem));
    assert_eq!(ops.iter().filter(|&&o| o == Opcode::Binop).count(), 3);
    assert_eq!(*ops.last().unwrap(), Opcode::WriteReg);
    let write = bb.insns().last().unwrap();
    assert_eq!(reg_of(&bb, write), Some(Reg::Rax));
}

#[rstest]
#[case::movups(Mnemonic::Movups, Type::F32x4)]
#[case::movaps(Mnemonic::Movaps, Type::F32x4)]
#[case::movupd(Mnemonic::Movupd, Type::F64x2)]
#[case::movapd(Mnemonic::Movapd, Type::F64x2)]
#[case::movdqu(Mnemonic::Movdqu, Type::I32x4)]
#[case::movdqa(Mnemonic::Movdqa, Type::I32x4)]
fn vector_moves_use_fixed_lane_types(#[case] mnemonic: Mnemonic, #[case] ty: Type) {
    let bb = lifted(MachInsn::new(
        mnemonic,
        [Reg::Xmm0.into(), Reg::Xmm1.into()],
    ));
    assert_eq!(opcodes(&bb), vec![Opcode::ReadReg, Opcode::WriteReg]);
    let read = bb.insns().next().unwrap();
    assert_eq!(bb.insn(read).result_type(), ty);
}

#[test]
fn add_writes_back_and_sets_flags() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Add,
        [Reg::Eax.into(), Reg::Ecx.into()],
    ));
    let ops = opcodes(&bb);
    // Destination writeback plus six flag writes.
    assert_eq!(ops.iter().filter(|&&o| o == Opcode::WriteReg).count(), 7);
    // Every defined flag is computed, none is poison.
    assert!(!ops.contains(&Opcode::Poison));
    let flag_targets: Vec<_> = bb
        .insns()
        .filter(|&id| bb.insn(id).opcode() == Opcode::WriteReg)
        .filter_map(|id| reg_of(&bb, id))
        .filter(|r| r.width() == 1)
        .collect();
    assert_eq!(
        flag_targets,
        vec![Reg::Af, Reg::Sf, Reg::Zf, Reg::Pf, Reg::Of, Reg::Cf]
    );
}

#[test]
fn locked_add_goes_through_an_atomic() {
    let bb = lifted(
        MachInsn::new(
            Mnemonic::Add,
            [MemRef::base(Reg::Rbx, 32).into(), Reg::Ecx.into()],
        )
        .with_width(32)
        .locked(),
    );
    let ops = opcodes(&bb);
    assert!(ops.contains(&Opcode::AtomicBinop));
    // The atomic performs the store; no separate store or plain load of
    // the destination is emitted.
    assert!(!ops.contains(&Opcode::StoreMem));
    assert!(!ops.contains(&Opcode::LoadMem));

    // The recomputed result uses the atomic's pre-image as lhs.
    let atomic = bb
        .insns()
        .find(|&id| bb.insn(id).opcode() == Opcode::AtomicBinop)
        .unwrap();
    let recompute = bb
        .insns()
        .find(|&id| bb.insn(id).opcode() == Opcode::Binop)
        .unwrap();
    assert_eq!(bb.insn(recompute).operand(1), &Operand::Use(atomic));
}

#[test]
fn locked_neg_goes_through_an_atomic() {
    let bb = lifted(
        MachInsn::new(Mnemonic::Neg, [MemRef::base(Reg::Rbx, 32).into()])
            .with_width(32)
            .locked(),
    );
    let ops = opcodes(&bb);
    assert!(ops.contains(&Opcode::AtomicUnop));
    // The atomic performs the store; no separate store or plain load of
    // the destination is emitted.
    assert!(!ops.contains(&Opcode::StoreMem));
    assert!(!ops.contains(&Opcode::LoadMem));

    // The recomputed result negates the atomic's pre-image, and the
    // pre-image carries the operand width.
    let atomic = bb
        .insns()
        .find(|&id| bb.insn(id).opcode() == Opcode::AtomicUnop)
        .unwrap();
    assert_eq!(bb.insn(atomic).result_type(), Type::I32);
    let recompute = bb
        .insns()
        .find(|&id| bb.insn(id).opcode() == Opcode::Unop)
        .unwrap();
    assert_eq!(bb.insn(recompute).operand(1), &Operand::Use(atomic));
}

#[test]
fn cmp_writes_no_general_register() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Cmp,
        [Reg::Eax.into(), Reg::Ecx.into()],
    ));
    for id in bb.insns() {
        if bb.insn(id).opcode() == Opcode::WriteReg {
            assert_eq!(reg_of(&bb, id).unwrap().width(), 1, "flag writes only");
        }
    }
}

#[test]
fn shift_flags_are_precise_or_poison() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Shl,
        [Reg::Eax.into(), MachInsn::imm(2, 8)],
    ));
    let ops = opcodes(&bb);
    // Defined flags go through selects preserving the count-zero case;
    // the architecturally undefined ones are poison.
    assert!(ops.contains(&Opcode::Select));
    let poisons: Vec<_> = bb
        .insns()
        .filter(|&id| bb.insn(id).opcode() == Opcode::Poison)
        .map(|id| {
            bb.insn(id)
                .operand(0)
                .as_const()
                .unwrap()
                .as_str()
                .unwrap()
                .to_owned()
        })
        .collect();
    assert_eq!(poisons.len(), 2);
    assert!(poisons.iter().all(|p| p.contains("undefined")));
}

#[test]
fn ret_imm_releases_stack_bytes_first() {
    let bb = lifted(MachInsn::new(Mnemonic::Ret, [MachInsn::imm(16, 16)]));
    let ops = opcodes(&bb);
    assert_eq!(*ops.last().unwrap(), Opcode::Ret);
    let bump = bb
        .insns()
        .find(|&id| bb.insn(id).opcode() == Opcode::Binop)
        .unwrap();
    assert_eq!(bb.insn(bump).operand(2).as_const().unwrap().as_i64(), 16);
}

#[test]
fn plain_ret_is_just_the_terminator() {
    let bb = lifted(MachInsn::new(Mnemonic::Ret, []));
    assert_eq!(opcodes(&bb), vec![Opcode::Ret]);
}

#[rstest]
#[case::ud2(Mnemonic::Ud2, "ud2")]
#[case::int3(Mnemonic::Int3, "int3")]
#[case::int1(Mnemonic::Int1, "int1")]
fn traps_carry_their_tag(#[case] mnemonic: Mnemonic, #[case] tag: &str) {
    let bb = lifted(MachInsn::new(mnemonic, []));
    assert_eq!(opcodes(&bb), vec![Opcode::Trap]);
    let trap = bb.insns().next().unwrap();
    assert_eq!(
        bb.insn(trap).operand(0).as_const().unwrap().as_str(),
        Some(tag)
    );
}

#[test]
fn call_and_jmp_read_pointer_targets() {
    let bb = lifted(MachInsn::new(Mnemonic::Call, [Reg::Rax.into()]));
    assert_eq!(opcodes(&bb), vec![Opcode::ReadReg, Opcode::Xcall]);
    let read = bb.insns().next().unwrap();
    assert_eq!(bb.insn(read).result_type(), Type::Pointer);

    let bb = lifted(MachInsn::new(Mnemonic::Jmp, [MachInsn::imm(0x401000, 64)]));
    assert_eq!(opcodes(&bb), vec![Opcode::Xjmp]);
    let jmp = bb.insns().next().unwrap();
    assert_eq!(
        bb.insn(jmp).operand(0).as_const().unwrap().as_u64(),
        0x401000
    );
}

#[test]
fn unhandled_mnemonics_are_reported_not_fatal() {
    let mut bb = BasicBlock::new();
    let err = lift(
        &AMD64,
        &MachInsn::new(Mnemonic::Cpuid, []).at(0x1234),
        &mut bb,
    )
    .unwrap_err();
    match err {
        SemaError::At { ip, source } => {
            assert_eq!(ip, 0x1234);
            assert!(matches!(*source, SemaError::UnhandledMnemonic(Mnemonic::Cpuid)));
        }
        other => panic!("unexpected diagnostic: {other}"),
    }
    assert!(bb.is_empty());
}

#[test]
fn emitted_instructions_are_ip_tagged() {
    let mut bb = BasicBlock::new();
    lift(
        &AMD64,
        &MachInsn::new(Mnemonic::Add, [Reg::Eax.into(), Reg::Ecx.into()]).at(0x401000),
        &mut bb,
    )
    .unwrap();
    assert!(bb.insns().all(|id| bb.insn(id).ip() == 0x401000));

    // The tag does not leak onto instructions pushed afterwards.
    let later = bb.push_nop().unwrap();
    assert_eq!(bb.insn(later).ip(), NO_LABEL);
}

#[test]
fn segment_overrides_reach_the_memory_operand() {
    let bb = lifted(MachInsn::new(
        Mnemonic::Mov,
        [
            Reg::Eax.into(),
            MemRef::base(Reg::Rbx, 32).with_seg(Reg::Fs).into(),
        ],
    ));
    let load = bb
        .insns()
        .find(|&id| bb.insn(id).opcode() == Opcode::LoadMem)
        .unwrap();
    let seg = bb.insn(load).operand(0).as_const().unwrap().as_seg().unwrap();
    assert_ne!(seg, rift_ir::Seg::NONE);
}
