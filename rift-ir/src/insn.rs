use core::cell::Cell;

use smallvec::SmallVec;

use crate::{InsnId, Opcode, OpcodeDesc, Operand, Slot, Type, UseRef};

/// Fake instruction-pointer value tagging synthetic instructions.
pub const NO_LABEL: u64 = u64::MAX;

/// A single SSA instruction.
///
/// There is one instruction shape for every opcode: the opcode tag, up to
/// two template types parameterizing it, and the operand array. Everything
/// else about its meaning lives in the [`OpcodeDesc`] table.
///
/// Instructions are owned by the arena of their [`BasicBlock`] and are
/// handled through [`InsnId`]; the node address never changes while the
/// instruction lives, so operand slots have stable identities.
///
/// [`BasicBlock`]: crate::BasicBlock
pub struct Insn {
    pub(crate) opcode: Opcode,
    pub(crate) template: [Type; 2],
    pub(crate) operands: SmallVec<[Operand; 4]>,
    pub(crate) name: u32,
    pub(crate) ip: u64,
    pub(crate) prev: Option<InsnId>,
    pub(crate) next: Option<InsnId>,
    pub(crate) attached: bool,
    pub(crate) uses: Vec<UseRef>,

    /// Scratch word for pass algorithms; not part of any invariant.
    pub tmp_monotonic: Cell<u64>,
    /// Scratch word for pass algorithms; not part of any invariant.
    pub tmp_mapping: Cell<u64>,
}

impl Insn {
    pub(crate) fn new(opcode: Opcode, template: [Type; 2], name: u32, ip: u64) -> Self {
        Self {
            opcode,
            template,
            operands: SmallVec::new(),
            name,
            ip,
            prev: None,
            next: None,
            attached: false,
            uses: Vec::new(),
            tmp_monotonic: Cell::new(0),
            tmp_mapping: Cell::new(0),
        }
    }

    /// The opcode.
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// The opcode's static descriptor.
    pub fn desc(&self) -> &'static OpcodeDesc {
        self.opcode.desc()
    }

    /// Template types parameterizing polymorphic opcodes; unused entries
    /// are [`Type::None`].
    pub const fn template(&self) -> &[Type; 2] {
        &self.template
    }

    /// Monotonic per-block value name.
    pub const fn name(&self) -> u32 {
        self.name
    }

    /// Machine-code address this instruction originated from, or
    /// [`NO_LABEL`] for synthetic instructions.
    pub const fn ip(&self) -> u64 {
        self.ip
    }

    /// The operand slots.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// A single operand slot.
    pub fn operand(&self, index: usize) -> &Operand {
        &self.operands[index]
    }

    /// Current use-list: every operand slot referencing this instruction.
    pub fn uses(&self) -> &[UseRef] {
        &self.uses
    }

    /// Number of consumers currently referencing this instruction.
    pub fn use_count(&self) -> usize {
        self.uses.len()
    }

    /// True while detached from any block list.
    ///
    /// Detachment, the cleared block link and empty list neighbors always
    /// move together; the assertion documents the invariant.
    pub fn is_orphan(&self) -> bool {
        debug_assert!(self.attached || (self.prev.is_none() && self.next.is_none()));
        !self.attached
    }

    /// Result type, resolved from the descriptor: either a fixed schema
    /// type or one of the template types.
    pub fn result_type(&self) -> Type {
        self.desc().resolve(0, &self.template)
    }

    /// Expected type of operand `index` per the schema, with template
    /// back-references resolved. `Pack` means "any trailing operands are
    /// untyped", covering every index from the `pack` slot on.
    pub fn expected_operand_type(&self, index: usize) -> Type {
        let desc = self.desc();
        let slot = index + 1;
        if slot >= desc.slots.len() {
            debug_assert!(desc.has_pack());
            return Type::Pack;
        }
        match desc.slots[slot] {
            Slot::Ty(Type::Pack) => Type::Pack,
            _ => desc.resolve(slot, &self.template),
        }
    }
}
