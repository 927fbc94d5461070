//! The runtime engine, which executes a [`Program`].
//!
//! The engine is a state machine driven by the host. [`Engine::run`] executes instructions
//! until the program ends, until the configured [`ExecutionMode`] asks for a pause, or until
//! a library call can't complete right away. In the last case the engine is suspended and
//! hands out a [`Continuation`], nothing happens until the host passes it back to
//! [`Engine::resume`] together with the result of the call.
//!
//! Events are raised by the host with [`Engine::raise_event`]. They are only delivered at
//! instruction boundaries: the callback gets a fresh frame on top of the current call stack,
//! and runs to completion before the interrupted frame continues.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::core::*;

pub mod host;
pub use host::*;

pub mod memory;
pub use memory::Memory;

pub mod snapshot;
pub use snapshot::*;

pub mod stack;
pub use stack::Frame;

/// Misuse of the engine by its host. A program itself can't produce errors at run time
#[derive(Error, Debug)]
pub enum Error {
    #[error("There is no implementation for the library {0}")]
    MissingLibrary(String),

    #[error("The engine is suspended, waiting for {0} to complete")]
    Suspended(String),

    #[error("The continuation does not belong to the pending call")]
    InvalidContinuation,

    #[error("There is no event {library}.{event}")]
    UnknownEvent { library: String, event: String },

    #[error("The operand stack was empty at instruction {0}")]
    OperandStackEmpty(usize),

    #[error("There is no instruction at {0}")]
    InvalidAddress(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Running,
    /// waiting for a library call, see [`Engine::resume`]
    Suspended,
    Terminated,
}

/// How far [`Engine::run`] goes before it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    RunToEnd,
    /// pause before an instruction that belongs to another statement
    NextStatement,
    /// pause before an instruction on another line
    NextLine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// a step in a stepping mode was completed
    Paused,
    Suspended(Continuation),
    Terminated,
}

#[derive(Debug)]
struct PendingCall {
    continuation: Continuation,
    pushes_value: bool,
}

#[derive(Debug)]
pub struct Engine {
    program: Program,
    libraries: Libraries,
    /// LibraryId -> index into `libraries`
    bindings: Vec<Option<usize>>,
    memory: Memory,
    frames: Vec<Frame>,
    state: ExecutionState,
    mode: ExecutionMode,
    callbacks: HashMap<EventId, SubModuleId>,
    queued_events: VecDeque<SubModuleId>,
    pending_call: Option<PendingCall>,
    continuation_counter: u64,
}

impl Engine {
    /// Every library the program calls into must have an implementation
    pub fn new(program: Program, libraries: Libraries) -> Result<Self> {
        let used: HashSet<LibraryId> = program
            .instructions
            .iter()
            .filter_map(|i| match &i.code {
                OpCode::InvokeMethod(id) => Some(id.library),
                OpCode::LoadProperty(id) | OpCode::StoreProperty(id) => Some(id.library),
                _ => None,
            })
            .collect();

        let mut bindings = vec![];
        for (i, library) in program.manifest.libraries.iter().enumerate() {
            let slot = libraries.position(&library.name);
            if slot.is_none() && used.contains(&LibraryId(i)) {
                return Err(Error::MissingLibrary(library.name.clone()));
            }
            bindings.push(slot);
        }

        Ok(Self {
            program,
            libraries,
            bindings,
            memory: Memory::new(),
            frames: vec![Frame::new(ModuleId::Main, 0)],
            state: ExecutionState::Running,
            mode: ExecutionMode::default(),
            callbacks: HashMap::new(),
            queued_events: VecDeque::new(),
            pending_call: None,
            continuation_counter: 0,
        })
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// source of the instruction that is executed next
    pub fn current_range(&self) -> Option<TextRange> {
        let frame = self.frames.last()?;
        self.program.instructions.get(frame.ip).map(|i| i.range)
    }

    /// Executes instructions until the program terminates, suspends, or a step of the
    /// current [`ExecutionMode`] is done
    pub fn run(&mut self) -> Result<RunOutcome> {
        if let Some(pending) = &self.pending_call {
            return Err(Error::Suspended(pending.continuation.member.clone()));
        }
        self.deliver_events();
        if self.frames.is_empty() {
            self.state = ExecutionState::Terminated;
            return Ok(RunOutcome::Terminated);
        }

        let start = self.current_range();
        loop {
            let depth = self.frames.len();
            let ip = self.frames[depth - 1].ip;
            self.execute_next()?;

            if self.state == ExecutionState::Suspended {
                match &self.pending_call {
                    Some(pending) => {
                        return Ok(RunOutcome::Suspended(pending.continuation.clone()))
                    }
                    None => crate::utils::bug!("suspended without a pending call"),
                }
            }

            self.deliver_events();
            if self.frames.is_empty() {
                self.state = ExecutionState::Terminated;
                tracing::debug!("program terminated");
                return Ok(RunOutcome::Terminated);
            }

            // running the same statement again starts a new step
            let jumped_back = self.frames.len() == depth && self.frames[depth - 1].ip <= ip;
            if self.step_done(start, jumped_back) {
                return Ok(RunOutcome::Paused);
            }
        }
    }

    /// Completes the suspended library call. `value` is what the call returned, it's
    /// ignored for calls that don't return anything
    pub fn resume(&mut self, continuation: &Continuation, value: Option<Value>) -> Result<()> {
        let pending = match self.pending_call.take() {
            Some(p) if p.continuation == *continuation => p,
            other => {
                self.pending_call = other;
                return Err(Error::InvalidContinuation);
            }
        };
        tracing::debug!(member = %pending.continuation.member, "resuming");
        let frame = self.top_frame()?;
        if pending.pushes_value {
            frame.push(value.unwrap_or_else(Value::empty));
        }
        frame.ip += 1;
        self.state = ExecutionState::Running;
        Ok(())
    }

    /// Queues the callback registered for `event`. Does nothing if there is none
    pub fn raise_event(&mut self, event: EventId) {
        let Some(sub_module) = self.callbacks.get(&event).copied() else {
            tracing::debug!(event = %self.program.manifest.event_name(event), "no callback");
            return;
        };
        tracing::debug!(event = %self.program.manifest.event_name(event), "event raised");
        self.queued_events.push_back(sub_module);
        if self.state == ExecutionState::Terminated {
            self.state = ExecutionState::Running;
        }
    }

    pub fn raise_event_by_name(&mut self, library: &str, event: &str) -> Result<()> {
        let id = self
            .program
            .manifest
            .find_event(library, event)
            .ok_or_else(|| Error::UnknownEvent {
                library: library.into(),
                event: event.into(),
            })?;
        self.raise_event(id);
        Ok(())
    }

    pub fn snapshot(&self) -> DebuggerSnapshot {
        let execution_stack = self
            .frames
            .iter()
            .map(|f| FrameSnapshot {
                module: self.program.module_name(f.module).to_string(),
                ip: f.ip,
                range: self
                    .program
                    .instructions
                    .get(f.ip)
                    .map(|i| i.range)
                    .unwrap_or_default(),
            })
            .collect();
        let memory = self
            .memory
            .iter()
            .map(|(id, v)| (self.program.variable_name(id).to_string(), v.clone()))
            .collect();
        DebuggerSnapshot {
            execution_stack,
            memory,
        }
    }

    fn step_done(&self, start: Option<TextRange>, jumped_back: bool) -> bool {
        let next = self.current_range();
        match self.mode {
            ExecutionMode::RunToEnd => false,
            ExecutionMode::NextStatement => jumped_back || next != start,
            ExecutionMode::NextLine => {
                jumped_back || next.map(|r| r.start.line) != start.map(|r| r.start.line)
            }
        }
    }

    /// pushes frames for all queued callbacks, the first one raised ends up on top
    fn deliver_events(&mut self) {
        if self.state == ExecutionState::Suspended || self.queued_events.is_empty() {
            return;
        }
        let queued: Vec<_> = self.queued_events.drain(..).collect();
        for sub_module in queued.into_iter().rev() {
            let address = self.program.sub_module_address(sub_module);
            tracing::debug!(sub_module = %self.program.module_name(ModuleId::Sub(sub_module)), "delivering event");
            self.frames
                .push(Frame::new(ModuleId::Sub(sub_module), address));
        }
        self.state = ExecutionState::Running;
    }

    fn top_frame(&mut self) -> Result<&mut Frame> {
        let ip = self.frames.last().map(|f| f.ip).unwrap_or_default();
        self.frames.last_mut().ok_or(Error::InvalidAddress(ip))
    }

    fn execute_next(&mut self) -> Result<()> {
        let ip = self.top_frame()?.ip;
        let code = self
            .program
            .instructions
            .get(ip)
            .ok_or(Error::InvalidAddress(ip))?
            .code
            .clone();
        tracing::trace!(ip, ?code, "executing");

        use OpCode::*;
        match code {
            PushValue(value) => self.top_frame()?.push(value),
            LoadVariable(id) => {
                let value = self.memory.get(id);
                self.top_frame()?.push(value);
            }
            StoreVariable(id) => {
                let value = self.top_frame()?.pop()?;
                self.memory.set(id, value);
            }
            LoadArrayElement { array, indices } => {
                let keys = self.top_frame()?.pop_n(indices)?;
                let value = self.memory.get_element(array, &keys);
                self.top_frame()?.push(value);
            }
            StoreArrayElement { array, indices } => {
                let frame = self.top_frame()?;
                let value = frame.pop()?;
                let keys = frame.pop_n(indices)?;
                self.memory.set_element(array, &keys, value);
            }
            Binary(operator) => {
                let frame = self.top_frame()?;
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                frame.push(lhs.binary(operator, &rhs));
            }
            Negate => {
                let frame = self.top_frame()?;
                let value = frame.pop()?;
                frame.push(value.negate());
            }
            Pop => {
                self.top_frame()?.pop()?;
            }
            Jump(target) => {
                self.top_frame()?.ip = target;
                return Ok(());
            }
            JumpIfTrue(target) => {
                let frame = self.top_frame()?;
                frame.ip = if frame.pop()?.to_boolean() { target } else { ip + 1 };
                return Ok(());
            }
            JumpIfFalse(target) => {
                let frame = self.top_frame()?;
                frame.ip = if frame.pop()?.to_boolean() { ip + 1 } else { target };
                return Ok(());
            }
            ForLoopGuard(target) => {
                let frame = self.top_frame()?;
                let step = frame.pop()?.to_number();
                let to = frame.pop()?.to_number();
                let current = frame.pop()?.to_number();
                let done = if step.is_sign_negative() && !step.is_zero() {
                    current < to
                } else {
                    current > to
                };
                frame.ip = if done { target } else { ip + 1 };
                return Ok(());
            }
            InvokeSubModule(id) => {
                self.top_frame()?.ip += 1;
                let address = self.program.sub_module_address(id);
                tracing::debug!(sub_module = %self.program.module_name(ModuleId::Sub(id)), "call");
                self.frames.push(Frame::new(ModuleId::Sub(id), address));
                return Ok(());
            }
            InvokeMethod(id) => {
                let signature = self.program.manifest.method(id);
                let (count, returns_value) = (signature.parameters.len(), signature.returns_value);
                let args = self.top_frame()?.pop_n(count)?;
                let completion = self.library(id.library)?.call_method(id.index, args);
                let member = self.program.manifest.method_name(id);
                return self.complete(completion, returns_value, member);
            }
            LoadProperty(id) => {
                let completion = self.library(id.library)?.get_property(id.index);
                let member = self.program.manifest.property_name(id);
                return self.complete(completion, true, member);
            }
            StoreProperty(id) => {
                let value = self.top_frame()?.pop()?;
                let completion = self.library(id.library)?.set_property(id.index, value);
                let member = self.program.manifest.property_name(id);
                return self.complete(completion, false, member);
            }
            SetEventCallback { event, sub_module } => {
                self.callbacks.insert(event, sub_module);
            }
            Return => {
                if let Some(frame) = self.frames.pop() {
                    tracing::debug!(module = %self.program.module_name(frame.module), "return");
                }
                return Ok(());
            }
        }
        self.top_frame()?.ip += 1;
        Ok(())
    }

    fn library(&mut self, id: LibraryId) -> Result<&mut Box<dyn Library>> {
        let Some(slot) = self.bindings.get(id.0).copied().flatten() else {
            let name = self.program.manifest.library(id).name.clone();
            return Err(Error::MissingLibrary(name));
        };
        Ok(&mut self.libraries.implementations[slot])
    }

    fn complete(&mut self, completion: Completion, pushes_value: bool, member: String) -> Result<()> {
        match completion {
            Completion::Ready(value) => {
                let frame = self.top_frame()?;
                if pushes_value {
                    frame.push(value.unwrap_or_else(Value::empty));
                }
                frame.ip += 1;
            }
            Completion::Pending => {
                self.continuation_counter += 1;
                tracing::debug!(%member, "suspending");
                self.pending_call = Some(PendingCall {
                    continuation: Continuation {
                        id: self.continuation_counter,
                        member,
                    },
                    pushes_value,
                });
                self.state = ExecutionState::Suspended;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(builder: InstructionBuilder, variables: &[&str]) -> Program {
        let (instructions, labels) = builder.build();
        Program {
            instructions,
            sub_modules: vec![],
            labels,
            variables: variables.iter().map(|v| v.to_string()).collect(),
            manifest: LibraryManifest::default(),
        }
    }

    #[test]
    fn test_jump_if_true() {
        let range = TextRange::default();
        let mut builder = InstructionBuilder::new();
        let skip = builder.new_label();
        builder.push(OpCode::PushValue(Value::from("TRUE")), range);
        builder.push(OpCode::JumpIfTrue(skip.clone()), range);
        builder.push(OpCode::PushValue(1i64.into()), range);
        builder.push(OpCode::StoreVariable(VariableId(0)), range);
        builder.mark(skip);
        builder.push(OpCode::PushValue(2i64.into()), range);
        builder.push(OpCode::StoreVariable(VariableId(1)), range);
        builder.push(OpCode::Return, range);

        let mut engine = Engine::new(program(builder, &["a", "b"]), Libraries::new()).unwrap();
        assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.variable("a"), None);
        assert_eq!(snapshot.variable("B"), Some(&Value::from(2i64)));
    }

    #[test]
    fn test_missing_operand_is_an_error() {
        let mut builder = InstructionBuilder::new();
        builder.push(OpCode::Pop, TextRange::default());
        let mut engine = Engine::new(program(builder, &[]), Libraries::new()).unwrap();
        assert!(matches!(engine.run(), Err(Error::OperandStackEmpty(0))));
    }

    #[test]
    fn test_terminated_engine_stays_terminated() {
        let mut builder = InstructionBuilder::new();
        builder.push(OpCode::Return, TextRange::default());
        let mut engine = Engine::new(program(builder, &[]), Libraries::new()).unwrap();
        assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
        assert_eq!(engine.run().unwrap(), RunOutcome::Terminated);
        assert_eq!(engine.state(), ExecutionState::Terminated);
        assert!(engine.snapshot().execution_stack.is_empty());
    }
}
