use core::fmt;

use itertools::Itertools;

use crate::{
    Constant, Error, Insn, InsnId, MReg, Op, Opcode, Operand, Seg, Style, Type, UseRef,
    NO_LABEL,
};

const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_TEAL: &str = "\x1b[36m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_RESET: &str = "\x1b[0m";

enum SlotEntry {
    Occupied(Insn),
    Free(Option<u32>),
}

/// A basic block: an arena owning its instructions plus the ordered list
/// running through them.
///
/// All graph mutation goes through the block, which is the only party able
/// to see both ends of a use-edge; this is what keeps unlink-then-link
/// transitions atomic with respect to any observer.
///
/// The `push_*` builder family appends one instruction per opcode at the
/// tail, assigns a fresh monotonic name, stamps the current instruction
/// pointer tag and validates the result against the opcode descriptor
/// before it becomes visible.
pub struct BasicBlock {
    slots: Vec<SlotEntry>,
    free: Option<u32>,
    head: Option<InsnId>,
    tail: Option<InsnId>,
    len: usize,
    next_name: u32,
    ip: u64,
}

impl Default for BasicBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicBlock {
    /// Empty block.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: None,
            head: None,
            tail: None,
            len: 0,
            next_name: 0,
            ip: NO_LABEL,
        }
    }

    /// Number of attached instructions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no instruction is attached.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tags every subsequently pushed instruction with the given
    /// machine-code address.
    pub fn set_ip(&mut self, ip: u64) {
        self.ip = ip;
    }

    /// Reverts to the synthetic [`NO_LABEL`] tag.
    pub fn clear_ip(&mut self) {
        self.ip = NO_LABEL;
    }

    /// Currently applied instruction pointer tag.
    pub fn current_ip(&self) -> u64 {
        self.ip
    }

    /// Borrows an instruction. Panics on a destroyed handle, which is a
    /// programmer error.
    pub fn insn(&self, id: InsnId) -> &Insn {
        match &self.slots[id.index()] {
            SlotEntry::Occupied(insn) => insn,
            SlotEntry::Free(_) => panic!("use of destroyed instruction %{:x}", id.0),
        }
    }

    fn insn_mut(&mut self, id: InsnId) -> &mut Insn {
        match &mut self.slots[id.index()] {
            SlotEntry::Occupied(insn) => insn,
            SlotEntry::Free(_) => panic!("use of destroyed instruction %{:x}", id.0),
        }
    }

    /// The type an operand takes in this block: a constant's own type or
    /// the producer's result type.
    pub fn operand_type(&self, operand: &Operand) -> Type {
        match operand {
            Operand::Const(c) => c.ty(),
            Operand::Use(id) => self.insn(*id).result_type(),
        }
    }

    /// Ordered iteration over the attached instructions.
    ///
    /// The order is stable under in-place operand mutation but not under
    /// erasure; erasing passes collect the ids first.
    pub fn insns(&self) -> Insns<'_> {
        Insns {
            bb: self,
            cur: self.head,
        }
    }

    // ---- use-list maintenance ------------------------------------------

    fn link_use(&mut self, producer: InsnId, user: InsnId, index: u32) {
        self.insn_mut(producer).uses.push(UseRef { user, index });
    }

    fn unlink_use(&mut self, producer: InsnId, user: InsnId, index: u32) {
        let uses = &mut self.insn_mut(producer).uses;
        let pos = uses
            .iter()
            .position(|u| u.user == user && u.index == index)
            .expect("use-list entry missing for operand");
        uses.swap_remove(pos);
    }

    fn relink_use_index(&mut self, producer: InsnId, user: InsnId, old: u32, new: u32) {
        let uses = &mut self.insn_mut(producer).uses;
        let entry = uses
            .iter_mut()
            .find(|u| u.user == user && u.index == old)
            .expect("use-list entry missing for shifted operand");
        entry.index = new;
    }

    /// Reassigns one operand slot, unlinking the previous use-edge (if
    /// any) and linking the new one in the same critical section.
    pub fn set_operand(&mut self, id: InsnId, index: usize, value: impl Into<Operand>) {
        let value = value.into();
        if let Operand::Use(p) = self.insn(id).operand(index) {
            let p = *p;
            self.unlink_use(p, id, index as u32);
        }
        if let Operand::Use(p) = &value {
            self.link_use(*p, id, index as u32);
        }
        self.insn_mut(id).operands[index] = value;
    }

    /// Assigns successive operands starting at `index`. The empty list is
    /// a no-op.
    pub fn set_operands(
        &mut self,
        id: InsnId,
        index: usize,
        values: impl IntoIterator<Item = Operand>,
    ) {
        for (i, value) in values.into_iter().enumerate() {
            self.set_operand(id, index + i, value);
        }
    }

    /// Removes one operand slot, shifting the tail left and repairing the
    /// producer-side use-list index of every shifted use-edge. Constants
    /// shift without repair.
    pub fn erase_operand(&mut self, id: InsnId, index: usize) {
        if let Operand::Use(p) = self.insn(id).operand(index) {
            let p = *p;
            self.unlink_use(p, id, index as u32);
        }
        let old_len = self.insn(id).operands.len();
        self.insn_mut(id).operands.remove(index);
        for i in index..old_len - 1 {
            if let Operand::Use(p) = self.insn(id).operand(i) {
                let p = *p;
                self.relink_use_index(p, id, (i + 1) as u32, i as u32);
            }
        }
    }

    /// Rewires every operand slot referencing `of` to `with` and returns
    /// the number of slots rewritten. Afterwards `of` has an empty
    /// use-list; the instruction itself stays in place.
    pub fn replace_all_uses_with(&mut self, of: InsnId, with: impl Into<Operand>) -> usize {
        let with = with.into();
        debug_assert!(
            with.as_insn() != Some(of),
            "replacing a value with itself"
        );
        let uses = core::mem::take(&mut self.insn_mut(of).uses);
        let count = uses.len();
        for UseRef { user, index } in uses {
            if let Operand::Use(p) = &with {
                self.link_use(*p, user, index);
            }
            self.insn_mut(user).operands[index as usize] = with.clone();
        }
        count
    }

    // ---- list membership -----------------------------------------------

    /// Detaches an instruction from the block list. The arena keeps the
    /// node alive; reinsert it or [`destroy`](Self::destroy) it.
    /// Erasing an orphan is a programmer error.
    pub fn erase(&mut self, id: InsnId) -> InsnId {
        assert!(!self.insn(id).is_orphan(), "erasing an orphan instruction");
        let (prev, next) = {
            let insn = self.insn_mut(id);
            let links = (insn.prev, insn.next);
            insn.prev = None;
            insn.next = None;
            insn.attached = false;
            links
        };
        match prev {
            Some(p) => self.insn_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.insn_mut(n).prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
        id
    }

    /// Attaches a detached instruction at the tail.
    pub fn push_back(&mut self, id: InsnId) {
        assert!(self.insn(id).is_orphan(), "instruction is already attached");
        let tail = self.tail;
        {
            let insn = self.insn_mut(id);
            insn.prev = tail;
            insn.next = None;
            insn.attached = true;
        }
        match tail {
            Some(t) => self.insn_mut(t).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Attaches a detached instruction at the head.
    pub fn push_front(&mut self, id: InsnId) {
        match self.head {
            Some(h) => self.insert_before(h, id),
            None => self.push_back(id),
        }
    }

    /// Attaches a detached instruction immediately before `pos`.
    pub fn insert_before(&mut self, pos: InsnId, id: InsnId) {
        assert!(self.insn(id).is_orphan(), "instruction is already attached");
        let prev = self.insn(pos).prev;
        {
            let insn = self.insn_mut(id);
            insn.prev = prev;
            insn.next = Some(pos);
            insn.attached = true;
        }
        self.insn_mut(pos).prev = Some(id);
        match prev {
            Some(p) => self.insn_mut(p).next = Some(id),
            None => self.head = Some(id),
        }
        self.len += 1;
    }

    /// Attaches a detached instruction immediately after `pos`.
    pub fn insert_after(&mut self, pos: InsnId, id: InsnId) {
        match self.insn(pos).next {
            Some(n) => self.insert_before(n, id),
            None => self.push_back(id),
        }
    }

    /// Frees an orphan instruction, resetting its operands (which unlinks
    /// their producer edges). Destroying a still-used value is a bug; a
    /// debug assertion catches it.
    pub fn destroy(&mut self, id: InsnId) {
        assert!(self.insn(id).is_orphan(), "destroying an attached instruction");
        debug_assert!(
            self.insn(id).uses.is_empty(),
            "destroying a still-used value"
        );
        for i in 0..self.insn(id).operands.len() {
            if let Operand::Use(p) = self.insn(id).operand(i) {
                let p = *p;
                self.unlink_use(p, id, i as u32);
            }
        }
        self.slots[id.index()] = SlotEntry::Free(self.free);
        self.free = Some(id.0);
    }

    // ---- construction --------------------------------------------------

    fn alloc(&mut self, opcode: Opcode, template: [Type; 2]) -> InsnId {
        let name = self.next_name;
        self.next_name += 1;
        let insn = Insn::new(opcode, template, name, self.ip);
        match self.free {
            Some(slot) => {
                let next_free = match self.slots[slot as usize] {
                    SlotEntry::Free(next) => next,
                    SlotEntry::Occupied(_) => unreachable!("corrupt free list"),
                };
                self.free = next_free;
                self.slots[slot as usize] = SlotEntry::Occupied(insn);
                InsnId(slot)
            }
            None => {
                self.slots.push(SlotEntry::Occupied(insn));
                InsnId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Generic constructor behind the `push_*` family: allocates an
    /// instruction, installs and links its operands, validates it against
    /// the descriptor and attaches it at the tail.
    ///
    /// On a validation failure nothing becomes visible; the diagnostic is
    /// returned to the caller.
    pub fn push(
        &mut self,
        opcode: Opcode,
        template: [Type; 2],
        operands: impl IntoIterator<Item = Operand>,
    ) -> Result<InsnId, Error> {
        let id = self.alloc(opcode, template);
        for (i, operand) in operands.into_iter().enumerate() {
            if let Operand::Use(p) = &operand {
                self.link_use(*p, id, i as u32);
            }
            self.insn_mut(id).operands.push(operand);
        }
        if let Err(e) = self.validate(id) {
            self.destroy(id);
            return Err(e);
        }
        self.push_back(id);
        Ok(id)
    }

    /// Validates operand arity, operand types against the descriptor
    /// schema (resolving template references, stopping at `pack`) and the
    /// constexpr requirements. Returns the first violation.
    pub fn validate(&self, id: InsnId) -> Result<(), Error> {
        let insn = self.insn(id);
        let desc = insn.desc();
        let count = insn.operands().len();
        let arity_ok = if desc.has_pack() {
            count >= desc.arity() - 1
        } else {
            count == desc.arity()
        };
        if !arity_ok {
            return Err(Error::ArityMismatch {
                opcode: insn.opcode(),
                expected: desc.arity(),
                actual: count,
            });
        }

        for (i, operand) in insn.operands().iter().enumerate() {
            let expected = insn.expected_operand_type(i);
            if expected == Type::Pack {
                break;
            }
            let actual = self.operand_type(operand);
            if actual != expected {
                return Err(Error::OperandTypeMismatch {
                    index: i,
                    expected,
                    actual,
                    insn: self.render(id, Style::Plain),
                });
            }
        }

        for &cx in desc.constexprs {
            let i = cx as usize;
            if !insn.operands()[i].is_const() {
                return Err(Error::ConstexprMismatch {
                    index: i,
                    operand: self.render_operand(insn.operand(i), Style::Concise),
                    insn: self.render(id, Style::Plain),
                });
            }
        }
        Ok(())
    }

    // ---- builders ------------------------------------------------------

    /// Appends a `nop`.
    pub fn push_nop(&mut self) -> Result<InsnId, Error> {
        self.push(Opcode::Nop, [Type::None; 2], [])
    }

    /// Appends `binop op, lhs, rhs`; the template type is taken from the
    /// left operand.
    pub fn push_binop(
        &mut self,
        op: Op,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        let ty = self.operand_type(&lhs);
        self.push(
            Opcode::Binop,
            [ty, Type::None],
            [Constant::op(op).into(), lhs, rhs],
        )
    }

    /// Appends `unop op, value`.
    pub fn push_unop(&mut self, op: Op, value: impl Into<Operand>) -> Result<InsnId, Error> {
        let value = value.into();
        let ty = self.operand_type(&value);
        self.push(Opcode::Unop, [ty, Type::None], [Constant::op(op).into(), value])
    }

    /// Appends `cmp op, lhs, rhs`, producing an `i1`.
    pub fn push_cmp(
        &mut self,
        op: Op,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        let ty = self.operand_type(&lhs);
        self.push(
            Opcode::Cmp,
            [ty, Type::None],
            [Constant::op(op).into(), lhs, rhs],
        )
    }

    /// Appends a zero-extending (or truncating) cast to `into`.
    pub fn push_cast(&mut self, into: Type, value: impl Into<Operand>) -> Result<InsnId, Error> {
        let value = value.into();
        let from = self.operand_type(&value);
        self.push(Opcode::Cast, [from, into], [value])
    }

    /// Appends a sign-extending (or truncating) cast to `into`.
    pub fn push_sign_extend(
        &mut self,
        into: Type,
        value: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let value = value.into();
        let from = self.operand_type(&value);
        self.push(Opcode::CastSx, [from, into], [value])
    }

    /// Appends a bit pattern reinterpretation to `into`.
    pub fn push_bitcast(
        &mut self,
        into: Type,
        value: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let value = value.into();
        let from = self.operand_type(&value);
        self.push(Opcode::Bitcast, [from, into], [value])
    }

    /// Appends `select cond, on_true, on_false`.
    pub fn push_select(
        &mut self,
        cond: impl Into<Operand>,
        on_true: impl Into<Operand>,
        on_false: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let (cond, on_true, on_false) = (cond.into(), on_true.into(), on_false.into());
        let ty = self.operand_type(&on_true);
        self.push(Opcode::Select, [ty, Type::None], [cond, on_true, on_false])
    }

    /// Appends a typed load through `seg:ptr`.
    pub fn push_load_mem(
        &mut self,
        ty: Type,
        seg: Seg,
        ptr: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        self.push(
            Opcode::LoadMem,
            [ty, Type::None],
            [Constant::seg(seg).into(), ptr.into()],
        )
    }

    /// Appends a store of `value` through `seg:ptr`.
    pub fn push_store_mem(
        &mut self,
        seg: Seg,
        ptr: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let value = value.into();
        let ty = self.operand_type(&value);
        self.push(
            Opcode::StoreMem,
            [ty, Type::None],
            [Constant::seg(seg).into(), ptr.into(), value],
        )
    }

    /// Appends a typed architectural register read.
    pub fn push_read_reg(&mut self, ty: Type, reg: MReg) -> Result<InsnId, Error> {
        self.push(Opcode::ReadReg, [ty, Type::None], [Constant::reg(reg).into()])
    }

    /// Appends an architectural register write.
    pub fn push_write_reg(
        &mut self,
        reg: MReg,
        value: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let value = value.into();
        let ty = self.operand_type(&value);
        self.push(
            Opcode::WriteReg,
            [ty, Type::None],
            [Constant::reg(reg).into(), value],
        )
    }

    /// Appends an atomic read-modify-write of `op` against `seg:ptr`; the
    /// result is the memory pre-image.
    pub fn push_atomic_binop(
        &mut self,
        op: Op,
        seg: Seg,
        ptr: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        let rhs = rhs.into();
        let ty = self.operand_type(&rhs);
        self.push(
            Opcode::AtomicBinop,
            [ty, Type::None],
            [Constant::op(op).into(), Constant::seg(seg).into(), ptr.into(), rhs],
        )
    }

    /// Appends an atomic unary read-modify-write against `seg:ptr`; the
    /// result is the memory pre-image of type `ty`.
    pub fn push_atomic_unop(
        &mut self,
        ty: Type,
        op: Op,
        seg: Seg,
        ptr: impl Into<Operand>,
    ) -> Result<InsnId, Error> {
        self.push(
            Opcode::AtomicUnop,
            [ty, Type::None],
            [Constant::op(op).into(), Constant::seg(seg).into(), ptr.into()],
        )
    }

    /// Appends the indirect call terminator.
    pub fn push_xcall(&mut self, target: impl Into<Operand>) -> Result<InsnId, Error> {
        self.push(Opcode::Xcall, [Type::None; 2], [target.into()])
    }

    /// Appends the indirect jump terminator.
    pub fn push_xjmp(&mut self, target: impl Into<Operand>) -> Result<InsnId, Error> {
        self.push(Opcode::Xjmp, [Type::None; 2], [target.into()])
    }

    /// Appends the return terminator with architecture-defined operands.
    pub fn push_ret(
        &mut self,
        values: impl IntoIterator<Item = Operand>,
    ) -> Result<InsnId, Error> {
        self.push(Opcode::Ret, [Type::None; 2], values)
    }

    /// Appends a trap tagged with the originating instruction.
    pub fn push_trap(&mut self, tag: &'static str) -> Result<InsnId, Error> {
        self.push(Opcode::Trap, [Type::None; 2], [Constant::str(tag).into()])
    }

    /// Appends a typed poison value carrying a human-readable reason.
    pub fn push_poison(&mut self, ty: Type, reason: &'static str) -> Result<InsnId, Error> {
        self.push(
            Opcode::Poison,
            [ty, Type::None],
            [Constant::str(reason).into()],
        )
    }

    // ---- printing ------------------------------------------------------

    fn render_operand(&self, operand: &Operand, style: Style) -> String {
        match operand {
            Operand::Const(c) => match style {
                Style::Ansi => format!("{ANSI_GREEN}{c}{ANSI_RESET}"),
                _ => c.to_string(),
            },
            Operand::Use(id) => {
                let name = self.insn(*id).name();
                match style {
                    Style::Ansi => format!("{ANSI_YELLOW}%{name:x}{ANSI_RESET}"),
                    _ => format!("%{name:x}"),
                }
            }
        }
    }

    /// Renders one instruction as a line of the SSA dump:
    /// `%<name> = <opcode>[.<tt0>[.<tt1>]] <op0>, <op1>, …`.
    pub fn render(&self, id: InsnId, style: Style) -> String {
        let insn = self.insn(id);
        if style == Style::Concise {
            return format!("%{:x}", insn.name());
        }
        let desc = insn.desc();
        let ansi = style == Style::Ansi;

        let mut line = String::new();
        if insn.result_type() != Type::None {
            if ansi {
                line.push_str(ANSI_YELLOW);
            }
            line.push_str(&format!("%{:x}", insn.name()));
            if ansi {
                line.push_str(ANSI_RESET);
            }
            line.push_str(" = ");
        }
        if ansi {
            line.push_str(if desc.side_effects { ANSI_RED } else { ANSI_TEAL });
        }
        line.push_str(desc.name);
        for i in 0..desc.template_count as usize {
            line.push('.');
            line.push_str(&insn.template()[i].to_string());
        }
        if ansi {
            line.push_str(ANSI_RESET);
        }
        if !insn.operands().is_empty() {
            line.push(' ');
            line.push_str(
                &insn
                    .operands()
                    .iter()
                    .map(|op| self.render_operand(op, style))
                    .join(", "),
            );
        }
        line
    }

    /// Plain rendering of one instruction.
    pub fn display(&self, id: InsnId) -> String {
        self.render(id, Style::Plain)
    }
}

/// Ordered instruction iterator; see [`BasicBlock::insns`].
pub struct Insns<'a> {
    bb: &'a BasicBlock,
    cur: Option<InsnId>,
}

impl Iterator for Insns<'_> {
    type Item = InsnId;

    fn next(&mut self) -> Option<InsnId> {
        let id = self.cur?;
        self.cur = self.bb.insn(id).next;
        Some(id)
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.insns() {
            writeln!(f, "{}", self.render(id, Style::Plain))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn c32(v: i64) -> Constant {
        Constant::int(Type::I32, v as i128)
    }

    #[test]
    fn builders_type_and_name() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(3), c32(4)).unwrap();
        let b = bb.push_binop(Op::Add, a, c32(5)).unwrap();
        assert_eq!(bb.insn(a).result_type(), Type::I32);
        assert_eq!(bb.insn(a).name(), 0);
        assert_eq!(bb.insn(b).name(), 1);
        assert_eq!(bb.len(), 2);
        assert_eq!(bb.insn(a).use_count(), 1);
        assert_eq!(bb.display(b), "%1 = binop.i32 add, %0, 5");
    }

    #[test]
    fn use_lists_track_every_edge() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(1), c32(2)).unwrap();
        let b = bb.push_binop(Op::Mul, a, a).unwrap();
        assert_eq!(bb.insn(a).use_count(), 2);
        let uses: Vec<_> = bb.insn(a).uses().to_vec();
        assert!(uses.contains(&UseRef { user: b, index: 1 }));
        assert!(uses.contains(&UseRef { user: b, index: 2 }));

        // Switching a slot to a constant unlinks it.
        bb.set_operand(b, 2, c32(7));
        assert_eq!(bb.insn(a).use_count(), 1);
        assert_eq!(bb.insn(a).uses(), &[UseRef { user: b, index: 1 }]);
    }

    #[test]
    fn erase_operand_repairs_shifted_edges() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(1), c32(2)).unwrap();
        let r = bb.push_ret([Operand::Const(c32(9)), a.into(), a.into()]).unwrap();
        assert_eq!(bb.insn(a).use_count(), 2);

        // Drop the leading constant; both use-edges shift left by one.
        bb.erase_operand(r, 0);
        assert_eq!(bb.insn(r).operands().len(), 2);
        let mut uses: Vec<_> = bb.insn(a).uses().to_vec();
        uses.sort_by_key(|u| u.index);
        assert_eq!(
            uses,
            vec![UseRef { user: r, index: 0 }, UseRef { user: r, index: 1 }]
        );

        // Drop one of the edges themselves.
        bb.erase_operand(r, 0);
        assert_eq!(bb.insn(a).uses(), &[UseRef { user: r, index: 0 }]);
    }

    #[test]
    fn replace_all_uses_with_constant() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(3), c32(4)).unwrap();
        let b = bb.push_binop(Op::Add, a, c32(5)).unwrap();
        let c = bb.push_binop(Op::Sub, a, b).unwrap();
        let before = bb.len();

        let replaced = bb.replace_all_uses_with(a, c32(7));
        assert_eq!(replaced, 2);
        assert_eq!(bb.insn(a).use_count(), 0);
        assert_eq!(bb.len(), before);
        assert_eq!(bb.insn(b).operand(1), &Operand::Const(c32(7)));
        assert_eq!(bb.insn(c).operand(1), &Operand::Const(c32(7)));
    }

    #[test]
    fn replace_all_uses_with_value_relinks() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(1), c32(2)).unwrap();
        let b = bb.push_binop(Op::Add, c32(3), c32(4)).unwrap();
        let c = bb.push_unop(Op::Neg, a).unwrap();
        bb.replace_all_uses_with(a, b);
        assert_eq!(bb.insn(a).use_count(), 0);
        assert_eq!(bb.insn(b).use_count(), 1);
        assert_eq!(bb.insn(c).operand(1), &Operand::Use(b));
    }

    #[test]
    fn orphan_states_move_together() {
        let mut bb = BasicBlock::new();
        let a = bb.push_nop().unwrap();
        let b = bb.push_nop().unwrap();
        let c = bb.push_nop().unwrap();
        assert!(!bb.insn(b).is_orphan());

        bb.erase(b);
        assert!(bb.insn(b).is_orphan());
        assert_eq!(bb.len(), 2);
        assert_eq!(bb.insns().collect::<Vec<_>>(), vec![a, c]);

        // Reinsertion restores membership at the chosen position.
        bb.insert_before(a, b);
        assert!(!bb.insn(b).is_orphan());
        assert_eq!(bb.insns().collect::<Vec<_>>(), vec![b, a, c]);
    }

    #[test]
    fn destroy_unlinks_operand_edges() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(1), c32(2)).unwrap();
        let b = bb.push_unop(Op::Neg, a).unwrap();
        assert_eq!(bb.insn(a).use_count(), 1);
        bb.erase(b);
        bb.destroy(b);
        assert_eq!(bb.insn(a).use_count(), 0);

        // The slot is recycled by the next allocation.
        let c = bb.push_nop().unwrap();
        assert_eq!(c.index(), b.index());
    }

    #[test]
    fn validation_rejects_mismatched_types() {
        let mut bb = BasicBlock::new();
        let err = bb
            .push(
                Opcode::Binop,
                [Type::I32, Type::None],
                [
                    Constant::op(Op::Add).into(),
                    Constant::int(Type::I64, 1).into(),
                    Constant::int(Type::I32, 2).into(),
                ],
            )
            .unwrap_err();
        match err {
            Error::OperandTypeMismatch {
                index,
                expected,
                actual,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(expected, Type::I32);
                assert_eq!(actual, Type::I64);
            }
            other => panic!("unexpected diagnostic: {other}"),
        }
        // Nothing was attached.
        assert!(bb.is_empty());
    }

    #[test]
    fn validation_rejects_non_const_constexpr() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(1), c32(2)).unwrap();
        let ok = bb.push_binop(Op::Add, a, c32(1)).unwrap();
        // Corrupt the operator slot into a use-edge and re-validate.
        bb.set_operand(ok, 0, a);
        let err = bb.validate(ok).unwrap_err();
        match err {
            Error::OperandTypeMismatch { index, .. } => assert_eq!(index, 0),
            Error::ConstexprMismatch { index, .. } => assert_eq!(index, 0),
            other => panic!("unexpected diagnostic: {other}"),
        }
    }

    #[test]
    fn ret_tolerates_variadic_operands() {
        let mut bb = BasicBlock::new();
        assert!(bb.push_ret([]).is_ok());
        let a = bb.push_binop(Op::Add, c32(1), c32(2)).unwrap();
        assert!(bb.push_ret([a.into(), Operand::Const(c32(3))]).is_ok());
    }

    #[test]
    fn ip_tagging() {
        let mut bb = BasicBlock::new();
        let a = bb.push_nop().unwrap();
        bb.set_ip(0x1000);
        let b = bb.push_nop().unwrap();
        bb.clear_ip();
        let c = bb.push_nop().unwrap();
        assert_eq!(bb.insn(a).ip(), NO_LABEL);
        assert_eq!(bb.insn(b).ip(), 0x1000);
        assert_eq!(bb.insn(c).ip(), NO_LABEL);
    }

    #[test]
    fn rendering_styles() {
        let mut bb = BasicBlock::new();
        let a = bb.push_binop(Op::Add, c32(3), c32(4)).unwrap();
        let s = bb.push_write_reg(MReg(7), a).unwrap();
        assert_eq!(bb.display(a), "%0 = binop.i32 add, 3, 4");
        assert_eq!(bb.display(s), "write_reg.i32 r7, %0");
        assert_eq!(bb.render(a, Style::Concise), "%0");
        // Side-effecting opcodes get the reserved escape tag.
        assert!(bb.render(s, Style::Ansi).contains(ANSI_RED));
        assert!(bb.render(a, Style::Ansi).contains(ANSI_TEAL));
    }
}
