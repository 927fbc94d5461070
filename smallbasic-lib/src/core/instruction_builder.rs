use crate::core::*;
use crate::utils::bug;
use im::{HashMap, Vector};

/// A jump target before linking
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// created by the generator for control flow
    Generated(usize),
    /// written by the user, ASCII letters of the name are stored lowercased
    User(ModuleId, String),
}

impl Label {
    pub fn user(module: ModuleId, name: &str) -> Self {
        Label::User(module, name.to_ascii_lowercase())
    }
}

/// represents the instructions while they're being generated
///
/// Jumps refer to [`Label`]s, which are marked at some position. [`build()`](Self::build)
/// resolves every label to the index of the instruction that follows its mark.
#[derive(Debug, Clone, Default)]
pub struct InstructionBuilder {
    /// Basically the program
    pub text: Vector<OpCode<Label>>,
    /// range of the statement from which the corresponding OpCode was generated
    pub ranges: Vector<TextRange>,
    /// label -> index of the instruction it points to
    pub marks: HashMap<Label, usize>,
    label_counter: usize,
}

impl InstructionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// index the next pushed instruction will have
    pub fn position(&self) -> usize {
        self.text.len()
    }

    pub fn push(&mut self, code: OpCode<Label>, range: TextRange) {
        self.text.push_back(code);
        self.ranges.push_back(range);
    }

    pub fn new_label(&mut self) -> Label {
        self.label_counter += 1;
        Label::Generated(self.label_counter)
    }

    /// lets `label` point at the next pushed instruction
    pub fn mark(&mut self, label: Label) {
        if self.marks.insert(label.clone(), self.text.len()).is_some() {
            bug!("label {:?} was marked twice", label);
        }
    }

    /// Resolves all labels and returns the linked instructions together with the table of
    /// the labels the user wrote
    pub fn build(self) -> (Vec<Instruction>, Vec<LabelEntry>) {
        let marks = self.marks;
        let instructions = self
            .text
            .into_iter()
            .zip(self.ranges)
            .map(|(code, range)| Instruction {
                code: code.map_target(|label| match marks.get(&label) {
                    Some(address) => *address,
                    None => bug!("jump to label {:?}, which was never marked", label),
                }),
                range,
            })
            .collect();

        let mut labels: Vec<_> = marks
            .into_iter()
            .filter_map(|(label, address)| match label {
                Label::User(module, name) => Some(LabelEntry {
                    module,
                    name,
                    address,
                }),
                Label::Generated(_) => None,
            })
            .collect();
        labels.sort_by_key(|l| l.address);
        (instructions, labels)
    }
}
