//! Data-driven modules: a flat netlist of nets, cells, registers, memories
//! and child instances, interpreted by [`NetlistModule`].
//!
//! A [`NetlistBuilder`] declares the structure and validates it once in
//! [`NetlistBuilder::build`]. The resulting structure is shared (behind an
//! [`Rc`]) between a module and every instance that replaces it on reset;
//! only the signal storage is per-instance.
//!
//! Cells and instances evaluate in declaration order. Because the driver
//! repeats `eval` until nothing changes, a netlist declared out of
//! topological order still settles to the same values, only in more passes.
//! Combinational cycles are accepted here and surface as divergence.

use std::collections::HashMap;
use std::rc::Rc;

use kestrel_common::Value;

use crate::debug::{DebugFlags, DebugItem, DebugItems, Scope, PATH_SEPARATOR};
use crate::error::SimError;
use crate::module::{reset_by_adoption, Adopt, Module};
use crate::signal::{Memory, SignalMut, SignalRef, Wire};

/// Handle to a net declared on a [`NetlistBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NetId(u32);

/// Handle to a memory declared on a [`NetlistBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemId(u32);

impl NetId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl MemId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Combinational operation computed by a cell.
///
/// Shift amounts are unsigned and may be any width; shifting by the operand
/// width or more yields zero (or all sign bits for `Sshr`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellOp {
    /// A constant.
    Const(Value),
    /// Copy of another net.
    Buf(NetId),
    /// Bitwise NOT.
    Not(NetId),
    /// Bitwise AND.
    And(NetId, NetId),
    /// Bitwise OR.
    Or(NetId, NetId),
    /// Bitwise XOR.
    Xor(NetId, NetId),
    /// Modular addition.
    Add(NetId, NetId),
    /// Modular subtraction.
    Sub(NetId, NetId),
    /// Equality, 1 bit.
    Eq(NetId, NetId),
    /// Unsigned less-than, 1 bit.
    Ult(NetId, NetId),
    /// Signed less-than, 1 bit.
    Slt(NetId, NetId),
    /// Logical shift left by a net.
    Shl(NetId, NetId),
    /// Logical shift right by a net.
    Shr(NetId, NetId),
    /// Arithmetic shift right by a net.
    Sshr(NetId, NetId),
    /// `if sel { if_true } else { if_false }`; `sel` is 1 bit.
    Mux {
        /// Select.
        sel: NetId,
        /// Chosen when `sel` is 0.
        if_false: NetId,
        /// Chosen when `sel` is 1.
        if_true: NetId,
    },
    /// Bits `offset..offset + width(output)` of `src`.
    Slice {
        /// Source net.
        src: NetId,
        /// Lowest extracted bit.
        offset: u32,
    },
    /// `hi` above `lo`.
    Concat {
        /// Upper bits.
        hi: NetId,
        /// Lower bits.
        lo: NetId,
    },
    /// Zero extension to the output width.
    Zext(NetId),
    /// Sign extension to the output width.
    Sext(NetId),
    /// OR of all bits, 1 bit.
    ReduceOr(NetId),
    /// AND of all bits, 1 bit.
    ReduceAnd(NetId),
    /// XOR of all bits, 1 bit.
    ReduceXor(NetId),
    /// Asynchronous memory read; out-of-range addresses read zero.
    MemRead {
        /// Memory to read.
        mem: MemId,
        /// Word address.
        addr: NetId,
    },
}

/// A clocked register updating `q` from `d` on commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Register {
    /// Target; must be declared with [`NetlistBuilder::reg`].
    pub q: NetId,
    /// Next-value input.
    pub d: NetId,
    /// Optional 1-bit enable; `q` holds while low.
    pub enable: Option<NetId>,
    /// Optional 1-bit synchronous reset to the net's init value. Wins over
    /// `enable`.
    pub reset: Option<NetId>,
}

/// A synchronous memory write port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WritePort {
    /// Target memory.
    pub mem: MemId,
    /// Word address; out-of-range writes are dropped.
    pub addr: NetId,
    /// Data; must match the memory width.
    pub data: NetId,
    /// 1-bit write enable.
    pub enable: NetId,
    /// Ordering among ports hitting the same word; the highest wins.
    pub priority: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NetKind {
    Input,
    Output,
    Wire,
    Reg { output: bool },
}

#[derive(Clone, Debug)]
struct NetDecl {
    name: String,
    kind: NetKind,
    init: Value,
}

#[derive(Clone, Debug)]
struct MemDecl {
    name: String,
    width: u32,
    contents: Vec<Value>,
    external: bool,
    written: bool,
}

impl MemDecl {
    fn power_on(&self) -> Memory {
        if self.external {
            let mut memory = Memory::external(self.width, self.contents.len());
            memory.load(0, &self.contents);
            memory
        } else {
            Memory::with_contents(self.width, self.contents.clone())
        }
    }
}

#[derive(Clone, Debug)]
struct Cell {
    output: NetId,
    op: CellOp,
}

#[derive(Clone, Debug)]
struct InstanceBinding {
    name: String,
    inputs: Vec<(String, NetId)>,
    outputs: Vec<(String, NetId)>,
}

#[derive(Clone, Copy, Debug)]
enum EvalStep {
    Cell(usize),
    Instance(usize),
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Net(NetId),
    Mem(MemId),
    Instance(usize),
}

/// Validated, immutable structure of a netlist module.
#[derive(Debug)]
struct Netlist {
    nets: Vec<NetDecl>,
    memories: Vec<MemDecl>,
    cells: Vec<Cell>,
    registers: Vec<Register>,
    write_ports: Vec<WritePort>,
    instances: Vec<InstanceBinding>,
    order: Vec<EvalStep>,
    names: HashMap<String, Slot>,
}

/// Storage for one net.
#[derive(Clone, Debug, PartialEq, Eq)]
enum NetSlot {
    Value(Value),
    Wire(Wire),
}

impl NetSlot {
    fn current(&self) -> &Value {
        match self {
            NetSlot::Value(v) => v,
            NetSlot::Wire(w) => &w.curr,
        }
    }
}

/// Declares the structure of a [`NetlistModule`].
///
/// Declaration methods never fail; the first problem is remembered and
/// returned by [`NetlistBuilder::build`].
#[derive(Default)]
pub struct NetlistBuilder {
    nets: Vec<NetDecl>,
    memories: Vec<MemDecl>,
    cells: Vec<Cell>,
    registers: Vec<Register>,
    write_ports: Vec<WritePort>,
    instances: Vec<(InstanceBinding, Box<dyn Module>)>,
    order: Vec<EvalStep>,
    names: HashMap<String, Slot>,
    error: Option<SimError>,
}

fn invalid(reason: impl Into<String>) -> SimError {
    SimError::InvalidNetlist {
        reason: reason.into(),
    }
}

impl NetlistBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a module input, driven from outside.
    pub fn input(&mut self, name: &str, width: u32) -> NetId {
        self.net(name, NetKind::Input, Value::new(width))
    }

    /// Declares a combinational module output.
    pub fn output(&mut self, name: &str, width: u32) -> NetId {
        self.net(name, NetKind::Output, Value::new(width))
    }

    /// Declares an internal combinational net.
    pub fn wire(&mut self, name: &str, width: u32) -> NetId {
        self.net(name, NetKind::Wire, Value::new(width))
    }

    /// Declares an internal register with power-on value `init`.
    pub fn reg(&mut self, name: &str, init: Value) -> NetId {
        self.net(name, NetKind::Reg { output: false }, init)
    }

    /// Declares a registered module output with power-on value `init`.
    pub fn output_reg(&mut self, name: &str, init: Value) -> NetId {
        self.net(name, NetKind::Reg { output: true }, init)
    }

    /// Declares a cleared memory owned by the design.
    pub fn memory(&mut self, name: &str, width: u32, depth: usize) -> MemId {
        self.mem(name, width, vec![Value::new(width); depth], false)
    }

    /// Declares a memory owned by the design with power-on contents.
    pub fn memory_with_contents(&mut self, name: &str, width: u32, contents: Vec<Value>) -> MemId {
        if contents.iter().any(|w| w.width() != width) {
            self.fail(invalid(format!(
                "memory `{name}` initialized with words of the wrong width"
            )));
        }
        let contents = contents.into_iter().map(|w| w.zext(width)).collect();
        self.mem(name, width, contents, false)
    }

    /// Declares a host-owned memory whose contents survive reset.
    pub fn external_memory(&mut self, name: &str, width: u32, depth: usize) -> MemId {
        self.mem(name, width, vec![Value::new(width); depth], true)
    }

    /// Adds a combinational cell driving `output`.
    pub fn cell(&mut self, output: NetId, op: CellOp) {
        self.order.push(EvalStep::Cell(self.cells.len()));
        self.cells.push(Cell { output, op });
    }

    /// Adds a register.
    pub fn register(&mut self, register: Register) {
        self.registers.push(register);
    }

    /// Adds a memory write port.
    pub fn write_port(&mut self, port: WritePort) {
        if let Some(decl) = self.memories.get_mut(port.mem.index()) {
            decl.written = true;
        }
        self.write_ports.push(port);
    }

    /// Adds a child instance.
    ///
    /// Each `inputs` entry copies a net of this netlist onto the named input
    /// of `module` before it evaluates; each `outputs` entry drives a net of
    /// this netlist from the named signal of `module` afterwards.
    pub fn instance(
        &mut self,
        name: &str,
        module: impl Module + 'static,
        inputs: &[(&str, NetId)],
        outputs: &[(&str, NetId)],
    ) {
        let index = self.instances.len();
        if self.claim(name, Slot::Instance(index)) {
            let binding = InstanceBinding {
                name: name.to_string(),
                inputs: inputs.iter().map(|&(p, n)| (p.to_string(), n)).collect(),
                outputs: outputs.iter().map(|&(p, n)| (p.to_string(), n)).collect(),
            };
            self.order.push(EvalStep::Instance(index));
            self.instances.push((binding, Box::new(module)));
        }
    }

    /// Validates the structure and builds a module in its power-on state.
    pub fn build(self) -> Result<NetlistModule, SimError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let (bindings, instances): (Vec<_>, Vec<_>) = self.instances.into_iter().unzip();
        let netlist = Netlist {
            nets: self.nets,
            memories: self.memories,
            cells: self.cells,
            registers: self.registers,
            write_ports: self.write_ports,
            instances: bindings,
            order: self.order,
            names: self.names,
        };
        netlist.validate(&instances)?;
        let netlist = Rc::new(netlist);
        Ok(NetlistModule {
            nets: netlist.power_on_nets(),
            memories: netlist.memories.iter().map(MemDecl::power_on).collect(),
            netlist,
            instances,
        })
    }

    fn net(&mut self, name: &str, kind: NetKind, init: Value) -> NetId {
        let id = NetId(self.nets.len() as u32);
        self.claim(name, Slot::Net(id));
        self.nets.push(NetDecl {
            name: name.to_string(),
            kind,
            init,
        });
        id
    }

    fn mem(&mut self, name: &str, width: u32, contents: Vec<Value>, external: bool) -> MemId {
        let id = MemId(self.memories.len() as u32);
        self.claim(name, Slot::Mem(id));
        self.memories.push(MemDecl {
            name: name.to_string(),
            width,
            contents,
            external,
            written: false,
        });
        id
    }

    fn claim(&mut self, name: &str, slot: Slot) -> bool {
        if name.is_empty() || name.contains(PATH_SEPARATOR) {
            self.fail(invalid(format!("`{name}` is not a valid name")));
            return false;
        }
        if self.names.contains_key(name) {
            self.fail(SimError::DuplicateName {
                path: name.to_string(),
            });
            return false;
        }
        self.names.insert(name.to_string(), slot);
        true
    }

    fn fail(&mut self, error: SimError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl Netlist {
    fn power_on_nets(&self) -> Vec<NetSlot> {
        self.nets
            .iter()
            .map(|decl| match decl.kind {
                NetKind::Reg { .. } => NetSlot::Wire(Wire::with_init(decl.init.clone())),
                _ => NetSlot::Value(decl.init.clone()),
            })
            .collect()
    }

    fn decl(&self, id: NetId) -> Result<&NetDecl, SimError> {
        self.nets
            .get(id.index())
            .ok_or_else(|| invalid(format!("net #{} was declared on another builder", id.0)))
    }

    fn width(&self, id: NetId) -> Result<u32, SimError> {
        Ok(self.decl(id)?.init.width())
    }

    fn mem_width(&self, id: MemId) -> Result<u32, SimError> {
        self.memories
            .get(id.index())
            .map(|m| m.width)
            .ok_or_else(|| invalid(format!("memory #{} was declared on another builder", id.0)))
    }

    fn expect_width(&self, id: NetId, width: u32, role: &str) -> Result<(), SimError> {
        let actual = self.width(id)?;
        if actual != width {
            return Err(invalid(format!(
                "{role} `{}` is {actual} bits wide, expected {width}",
                self.decl(id)?.name
            )));
        }
        Ok(())
    }

    fn same_width(&self, a: NetId, b: NetId) -> Result<u32, SimError> {
        let width = self.width(a)?;
        self.expect_width(b, width, "operand")?;
        Ok(width)
    }

    /// Returns the width `op` produces for an output `output_width` wide.
    fn result_width(&self, op: &CellOp, output_width: u32) -> Result<u32, SimError> {
        use CellOp::*;
        Ok(match op {
            Const(v) => v.width(),
            Buf(a) | Not(a) => self.width(*a)?,
            And(a, b) | Or(a, b) | Xor(a, b) | Add(a, b) | Sub(a, b) => self.same_width(*a, *b)?,
            Eq(a, b) | Ult(a, b) | Slt(a, b) => {
                self.same_width(*a, *b)?;
                1
            }
            Shl(a, amount) | Shr(a, amount) | Sshr(a, amount) => {
                self.width(*amount)?;
                self.width(*a)?
            }
            Mux {
                sel,
                if_false,
                if_true,
            } => {
                self.expect_width(*sel, 1, "mux select")?;
                self.same_width(*if_false, *if_true)?
            }
            Slice { src, offset } => {
                let src_width = self.width(*src)?;
                if u64::from(*offset) + u64::from(output_width) > u64::from(src_width) {
                    return Err(invalid(format!(
                        "slice of {output_width} bits at offset {offset} exceeds `{}`",
                        self.decl(*src)?.name
                    )));
                }
                output_width
            }
            Concat { hi, lo } => self.width(*hi)? + self.width(*lo)?,
            Zext(a) | Sext(a) => {
                if self.width(*a)? > output_width {
                    return Err(invalid(format!(
                        "extension of `{}` narrows it",
                        self.decl(*a)?.name
                    )));
                }
                output_width
            }
            ReduceOr(a) | ReduceAnd(a) | ReduceXor(a) => {
                self.width(*a)?;
                1
            }
            MemRead { mem, addr } => {
                self.width(*addr)?;
                self.mem_width(*mem)?
            }
        })
    }

    /// Rejects a combinational driver on a register net; only a
    /// [`Register`] may drive one.
    fn expect_comb_target(&self, id: NetId, driver: &str) -> Result<(), SimError> {
        let decl = self.decl(id)?;
        if matches!(decl.kind, NetKind::Reg { .. }) {
            return Err(invalid(format!(
                "register `{}` is driven by {driver}",
                decl.name
            )));
        }
        Ok(())
    }

    fn validate(&self, instances: &[Box<dyn Module>]) -> Result<(), SimError> {
        let mut drivers = vec![0usize; self.nets.len()];

        for cell in &self.cells {
            let out = self.decl(cell.output)?;
            self.expect_comb_target(cell.output, "a cell")?;
            let width = out.init.width();
            let produced = self.result_width(&cell.op, width)?;
            if produced != width {
                return Err(invalid(format!(
                    "cell produces {produced} bits but `{}` is {width} bits wide",
                    out.name
                )));
            }
            drivers[cell.output.index()] += 1;
        }

        for (binding, module) in self.instances.iter().zip(instances) {
            for (port, net) in &binding.inputs {
                match module.signal(port) {
                    Some(SignalRef::Value(v)) => {
                        self.expect_width(*net, v.width(), "instance input")?;
                    }
                    _ => {
                        return Err(invalid(format!(
                            "instance `{}` has no input `{port}`",
                            binding.name
                        )))
                    }
                }
            }
            for (port, net) in &binding.outputs {
                match module.signal(port).and_then(|s| s.current().map(Value::width)) {
                    Some(width) => {
                        self.expect_width(*net, width, "instance output")?;
                        self.expect_comb_target(*net, "an instance output")?;
                    }
                    None => {
                        return Err(invalid(format!(
                            "instance `{}` has no scalar output `{port}`",
                            binding.name
                        )))
                    }
                }
                drivers[net.index()] += 1;
            }
        }

        for reg in &self.registers {
            let q = self.decl(reg.q)?;
            if !matches!(q.kind, NetKind::Reg { .. }) {
                return Err(invalid(format!("register target `{}` is not a reg", q.name)));
            }
            self.expect_width(reg.d, q.init.width(), "register input")?;
            if let Some(enable) = reg.enable {
                self.expect_width(enable, 1, "register enable")?;
            }
            if let Some(reset) = reg.reset {
                self.expect_width(reset, 1, "register reset")?;
            }
            drivers[reg.q.index()] += 1;
        }

        for port in &self.write_ports {
            let width = self.mem_width(port.mem)?;
            self.expect_width(port.data, width, "write data")?;
            self.expect_width(port.enable, 1, "write enable")?;
            self.width(port.addr)?;
        }

        for (decl, count) in self.nets.iter().zip(drivers) {
            let ok = match decl.kind {
                NetKind::Input => count == 0,
                NetKind::Output | NetKind::Wire | NetKind::Reg { .. } => count == 1,
            };
            if !ok {
                return Err(invalid(format!("`{}` has {count} drivers", decl.name)));
            }
        }
        Ok(())
    }
}

/// A module interpreting a validated netlist.
pub struct NetlistModule {
    netlist: Rc<Netlist>,
    nets: Vec<NetSlot>,
    memories: Vec<Memory>,
    instances: Vec<Box<dyn Module>>,
}

impl NetlistModule {
    /// The current value of a net.
    pub fn net(&self, id: NetId) -> Option<&Value> {
        self.nets.get(id.index()).map(NetSlot::current)
    }

    /// A memory.
    pub fn memory(&self, id: MemId) -> Option<&Memory> {
        self.memories.get(id.index())
    }

    /// Copies `image` into a memory starting at word `offset`.
    ///
    /// Returns the number of words written.
    pub fn load_memory(&mut self, id: MemId, offset: usize, image: &[Value]) -> usize {
        self.memories
            .get_mut(id.index())
            .map_or(0, |m| m.load(offset, image))
    }

    fn flags(&self, decl: &NetDecl, scope: &Scope) -> DebugFlags {
        match decl.kind {
            NetKind::Input => scope.input_flags(&decl.name),
            NetKind::Output => DebugFlags::OUTPUT | DebugFlags::DRIVEN_COMB,
            NetKind::Wire => DebugFlags::DRIVEN_COMB,
            NetKind::Reg { output: true } => DebugFlags::OUTPUT | DebugFlags::DRIVEN_SYNC,
            NetKind::Reg { output: false } => DebugFlags::DRIVEN_SYNC,
        }
    }
}

fn drive(nets: &mut [NetSlot], id: NetId, value: &Value) -> bool {
    match &mut nets[id.index()] {
        NetSlot::Value(v) => v.assign(value),
        NetSlot::Wire(_) => false,
    }
}

fn shift_amount(value: &Value) -> u32 {
    value
        .to_u64()
        .and_then(|a| u32::try_from(a).ok())
        .unwrap_or(u32::MAX)
}

fn address(value: &Value) -> usize {
    value
        .to_u64()
        .and_then(|a| usize::try_from(a).ok())
        .unwrap_or(usize::MAX)
}

fn compute(op: &CellOp, width: u32, nets: &[NetSlot], memories: &[Memory]) -> Value {
    use CellOp::*;
    let net = move |id: &NetId| nets[id.index()].current();
    match op {
        Const(v) => v.clone(),
        Buf(a) => net(a).clone(),
        Not(a) => !net(a),
        And(a, b) => net(a) & net(b),
        Or(a, b) => net(a) | net(b),
        Xor(a, b) => net(a) ^ net(b),
        Add(a, b) => net(a).wrapping_add(net(b)),
        Sub(a, b) => net(a).wrapping_sub(net(b)),
        Eq(a, b) => Value::from_bool(net(a) == net(b)),
        Ult(a, b) => Value::from_bool(net(a).ucmp(net(b)).is_lt()),
        Slt(a, b) => Value::from_bool(net(a).scmp(net(b)).is_lt()),
        Shl(a, n) => net(a).shl(shift_amount(net(n))),
        Shr(a, n) => net(a).shr(shift_amount(net(n))),
        Sshr(a, n) => net(a).sshr(shift_amount(net(n))),
        Mux {
            sel,
            if_false,
            if_true,
        } => {
            if net(sel).to_bool() {
                net(if_true).clone()
            } else {
                net(if_false).clone()
            }
        }
        Slice { src, offset } => net(src).slice(*offset, width),
        Concat { hi, lo } => Value::concat(net(hi), net(lo)),
        Zext(a) => net(a).zext(width),
        Sext(a) => net(a).sext(width),
        ReduceOr(a) => net(a).reduce_or(),
        ReduceAnd(a) => net(a).reduce_and(),
        ReduceXor(a) => net(a).reduce_xor(),
        MemRead { mem, addr } => memories[mem.index()].read(address(net(addr))).clone(),
    }
}

fn eval_instance(
    binding: &InstanceBinding,
    module: &mut dyn Module,
    nets: &mut [NetSlot],
) -> bool {
    let mut changed = false;
    for (port, net) in &binding.inputs {
        if let Some(SignalMut::Value(target)) = module.signal_mut(port) {
            changed |= target.assign(nets[net.index()].current());
        }
    }
    changed |= module.eval();
    for (port, net) in &binding.outputs {
        if let Some(value) = module.signal(port).and_then(|s| s.current().cloned()) {
            changed |= drive(nets, *net, &value);
        }
    }
    changed
}

impl Module for NetlistModule {
    fn eval(&mut self) -> bool {
        let netlist = Rc::clone(&self.netlist);
        let mut changed = false;

        for step in &netlist.order {
            match *step {
                EvalStep::Cell(i) => {
                    let cell = &netlist.cells[i];
                    let width = netlist.nets[cell.output.index()].init.width();
                    let value = compute(&cell.op, width, &self.nets, &self.memories);
                    changed |= drive(&mut self.nets, cell.output, &value);
                }
                EvalStep::Instance(i) => {
                    changed |= eval_instance(
                        &netlist.instances[i],
                        &mut *self.instances[i],
                        &mut self.nets,
                    );
                }
            }
        }

        for reg in &netlist.registers {
            let reset = reg.reset.is_some_and(|r| self.nets[r.index()].current().to_bool());
            let hold = reg
                .enable
                .is_some_and(|e| !self.nets[e.index()].current().to_bool());
            let next = if reset {
                netlist.nets[reg.q.index()].init.clone()
            } else if hold {
                self.nets[reg.q.index()].current().clone()
            } else {
                self.nets[reg.d.index()].current().clone()
            };
            if let NetSlot::Wire(w) = &mut self.nets[reg.q.index()] {
                w.next.assign(&next);
            }
        }

        for (port, wp) in netlist.write_ports.iter().enumerate() {
            let memory = &mut self.memories[wp.mem.index()];
            if self.nets[wp.enable.index()].current().to_bool() {
                let index = address(self.nets[wp.addr.index()].current());
                let data = self.nets[wp.data.index()].current().clone();
                memory.update(port, index, data, wp.priority);
            } else {
                memory.retract(port);
            }
        }

        changed
    }

    fn commit(&mut self) -> bool {
        let mut changed = false;
        for slot in &mut self.nets {
            if let NetSlot::Wire(w) = slot {
                changed |= w.commit();
            }
        }
        for memory in &mut self.memories {
            changed |= memory.commit();
        }
        for instance in &mut self.instances {
            changed |= instance.commit();
        }
        changed
    }

    fn reset(&mut self) {
        reset_by_adoption(self);
    }

    fn debug_info(&self, items: &mut DebugItems, scope: &Scope) -> Result<(), SimError> {
        for (decl, slot) in self.netlist.nets.iter().zip(&self.nets) {
            let signal = match slot {
                NetSlot::Value(v) => SignalRef::Value(v),
                NetSlot::Wire(w) => SignalRef::Wire(w),
            };
            items.add(scope, &decl.name, DebugItem::new(signal, self.flags(decl, scope)))?;
        }
        for (decl, memory) in self.netlist.memories.iter().zip(&self.memories) {
            let flags = if decl.written {
                DebugFlags::DRIVEN_SYNC
            } else {
                DebugFlags::UNDRIVEN
            };
            items.add(scope, &decl.name, DebugItem::new(memory.into(), flags))?;
        }
        Ok(())
    }

    fn children(&self) -> Vec<(&str, &dyn Module)> {
        self.netlist
            .instances
            .iter()
            .zip(&self.instances)
            .map(|(binding, module)| (binding.name.as_str(), &**module as &dyn Module))
            .collect()
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Module> {
        match self.netlist.names.get(name)? {
            Slot::Instance(i) => Some(self.instances.get_mut(*i)?.as_mut()),
            _ => None,
        }
    }

    fn bound_inputs(&self, name: &str) -> Option<Vec<&str>> {
        match self.netlist.names.get(name)? {
            Slot::Instance(i) => {
                let binding = self.netlist.instances.get(*i)?;
                Some(binding.inputs.iter().map(|(port, _)| port.as_str()).collect())
            }
            _ => None,
        }
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        match self.netlist.names.get(name)? {
            Slot::Net(id) => Some(match &self.nets[id.index()] {
                NetSlot::Value(v) => SignalRef::Value(v),
                NetSlot::Wire(w) => SignalRef::Wire(w),
            }),
            Slot::Mem(id) => Some(SignalRef::Memory(&self.memories[id.index()])),
            Slot::Instance(_) => None,
        }
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        match self.netlist.names.get(name)? {
            Slot::Net(id) => Some(match &mut self.nets[id.index()] {
                NetSlot::Value(v) => SignalMut::Value(v),
                NetSlot::Wire(w) => SignalMut::Wire(w),
            }),
            Slot::Mem(id) => Some(SignalMut::Memory(&mut self.memories[id.index()])),
            Slot::Instance(_) => None,
        }
    }
}

impl Adopt for NetlistModule {
    fn adopt(previous: &mut Self) -> Self {
        let netlist = Rc::clone(&previous.netlist);
        let memories = netlist
            .memories
            .iter()
            .zip(previous.memories.iter_mut())
            .map(|(decl, prev)| {
                if decl.external {
                    Memory::adopt_from(prev)
                } else {
                    decl.power_on()
                }
            })
            .collect();
        let instances = std::mem::take(&mut previous.instances)
            .into_iter()
            .map(|mut instance| {
                instance.reset();
                instance
            })
            .collect();
        Self {
            nets: netlist.power_on_nets(),
            memories,
            netlist,
            instances,
        }
    }
}
