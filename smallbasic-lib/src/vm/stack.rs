use crate::core::*;
use crate::vm::{Error, Result};

/// One activation of the main module, a sub-routine or an event callback
#[derive(Debug, Clone)]
pub struct Frame {
    pub module: ModuleId,
    /// index of the next instruction
    pub ip: usize,
    /// operands of the expression that is being evaluated
    pub operands: Vec<Value>,
}

impl Frame {
    pub fn new(module: ModuleId, ip: usize) -> Self {
        Self {
            module,
            ip,
            operands: vec![],
        }
    }

    pub fn push(&mut self, value: Value) {
        self.operands.push(value);
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.operands.pop().ok_or(Error::OperandStackEmpty(self.ip))
    }

    /// pops the `n` topmost operands, in the order they were pushed
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if self.operands.len() < n {
            return Err(Error::OperandStackEmpty(self.ip));
        }
        Ok(self.operands.split_off(self.operands.len() - n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_n_keeps_order() {
        let mut frame = Frame::new(ModuleId::Main, 0);
        for i in 0..4i64 {
            frame.push(i.into());
        }
        assert_eq!(
            frame.pop_n(2).unwrap(),
            vec![Value::from(2i64), Value::from(3i64)]
        );
        assert_eq!(frame.operands.len(), 2);
        assert!(frame.pop_n(3).is_err());
    }
}
