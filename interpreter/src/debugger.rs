use std::io::{Stdout, Write};

use anyhow::{anyhow, bail, Result};
use crossterm::{self as ct, terminal};
use rustyline::{error::ReadlineError, DefaultEditor};

use smallbasic_lib::vm::{DebuggerSnapshot, Engine, ExecutionMode, ExecutionState, RunOutcome};

use crate::libraries::Host;

#[derive(PartialEq, Clone)]
enum UserCommand {
    Next,
    NextLine,
    Continue,
    LastCommand,
    ShowStack,
    ShowMemory,
    ShowVariable(String),
    Quit,
}

pub fn run(
    engine: &mut Engine,
    host: &Host,
    src: Option<&str>,
    stdout: &mut Stdout,
) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut last_cmd: Option<UserCommand> = None;

    use UserCommand::*;
    loop {
        if engine.state() == ExecutionState::Terminated {
            return Ok(());
        }
        render_state(stdout, engine, src)?;
        stdout.flush()?;
        let mut cmd = read_line(&mut rl)?;
        if cmd == UserCommand::LastCommand {
            if let Some(last) = &last_cmd {
                cmd = last.clone();
            }
        }
        match &cmd {
            LastCommand => {
                // only reached if there was no last command, in which case it's a noop
            }
            Next => step(engine, host, &mut rl, ExecutionMode::NextStatement)?,
            NextLine => step(engine, host, &mut rl, ExecutionMode::NextLine)?,
            Continue => step(engine, host, &mut rl, ExecutionMode::RunToEnd)?,
            ShowStack => {
                for (i, frame) in engine.snapshot().execution_stack.iter().enumerate().rev() {
                    println!("{}: {} at {} {}", i, frame.module, frame.ip, frame.range);
                }
            }
            ShowMemory => {
                for (name, value) in engine.snapshot().memory {
                    println!("{} = {}", name, value);
                }
            }
            ShowVariable(name) => match engine.snapshot().variable(name) {
                Some(value) => println!("{} = {}", name, value),
                None => println!("{} was not assigned yet", name),
            },
            Quit => return Ok(()),
        }
        last_cmd = Some(cmd);
    }
}

/// runs until the engine pauses or terminates, asking the user for input whenever a
/// library waits for some
fn step(
    engine: &mut Engine,
    host: &Host,
    rl: &mut DefaultEditor,
    mode: ExecutionMode,
) -> Result<()> {
    engine.set_mode(mode);
    loop {
        match engine.run()? {
            RunOutcome::Paused | RunOutcome::Terminated => return Ok(()),
            RunOutcome::Suspended(continuation) => {
                let value = host.complete(|| match rl.readline("input> ") {
                    Ok(line) => Ok(Some(line)),
                    Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
                    Err(other) => Err(other.into()),
                })?;
                engine.resume(&continuation, Some(value))?;
                if mode != ExecutionMode::RunToEnd {
                    return Ok(());
                }
            }
        }
    }
}

fn read_line(rl: &mut DefaultEditor) -> Result<UserCommand> {
    loop {
        let line = rl.readline("> ");
        use ReadlineError::*;
        match line {
            Ok(line) => match parse_line(&line) {
                Ok(cmd) => return Ok(cmd),
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(Interrupted | Eof) => return Ok(UserCommand::Quit),
            Err(other) => return Err(other.into()),
        }
    }
}

fn parse_line(line: &str) -> Result<UserCommand> {
    use UserCommand::*;
    let elems: Vec<_> = line.split_whitespace().collect();

    match elems.first() {
        None => Ok(LastCommand),
        Some(&("n" | "next")) => Ok(Next),
        Some(&("l" | "line")) => Ok(NextLine),
        Some(&("c" | "continue")) => Ok(Continue),
        Some(&("s" | "show")) => parse_show(&elems[1..]),
        Some(&("q" | "quit")) => Ok(Quit),
        Some(_) => Err(anyhow!("Invalid Command")),
    }
}

fn parse_show(elems: &[&str]) -> Result<UserCommand> {
    match elems {
        [] => Err(anyhow!("show needs an argument")),
        ["s" | "stack"] => Ok(UserCommand::ShowStack),
        ["m" | "memory"] => Ok(UserCommand::ShowMemory),
        ["v" | "var", name] => Ok(UserCommand::ShowVariable(name.to_string())),
        _ => bail!("Invalid word after show"),
    }
}

/// rows below the panels, kept free for the prompt and the output of commands
const PROMPT_ROWS: u16 = 6;
/// the right column never gets narrower than this, unless the terminal is
const MIN_SIDE_WIDTH: u16 = 24;

struct Rect {
    w: u16,
    h: u16,
    x: u16,
    y: u16,
}

/// Source on the left, instructions, call stack and memory stacked on the right
struct Layout {
    source: Rect,
    instructions: Rect,
    stack: Rect,
    memory: Rect,
}

impl Rect {
    /// The first row shows the title, the remaining ones the lines, cut or padded to the
    /// width of the rect
    fn render(
        &self,
        stdout: &mut Stdout,
        title: &str,
        lines: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        let width = self.w as usize;
        let header = format!("-- {} ", title);
        let rows = std::iter::once(format!("{:-<width$}", header, width = width))
            .chain(lines)
            .chain(std::iter::repeat_with(String::new));
        for (row, line) in (self.y..self.y + self.h).zip(rows) {
            ct::queue!(stdout, ct::cursor::MoveTo(self.x, row))?;
            let line: String = line.chars().take(width.saturating_sub(1)).collect();
            print!("{:<width$}", line, width = width);
        }
        Ok(())
    }

    /// rows available below the title
    fn body_rows(&self) -> usize {
        self.h.saturating_sub(1).into()
    }
}

impl Layout {
    /// The call stack panel grows with the number of frames, up to a quarter of the height.
    /// Memory gets a third, the instructions whatever is left
    fn new((term_w, term_h): (u16, u16), frames: usize) -> Self {
        let height = term_h.saturating_sub(PROMPT_ROWS).max(6);
        let side_w = (term_w / 3).max(MIN_SIDE_WIDTH).min(term_w);
        let source_w = term_w - side_w;

        let wanted_stack_h = u16::try_from(frames + 1).unwrap_or(u16::MAX);
        let stack_h = wanted_stack_h.min(height / 4).max(2);
        let memory_h = height / 3;
        let instructions_h = height.saturating_sub(stack_h + memory_h);

        Layout {
            source: Rect {
                x: 0,
                y: 0,
                w: source_w,
                h: height,
            },
            instructions: Rect {
                x: source_w,
                y: 0,
                w: side_w,
                h: instructions_h,
            },
            stack: Rect {
                x: source_w,
                y: instructions_h,
                w: side_w,
                h: stack_h,
            },
            memory: Rect {
                x: source_w,
                y: instructions_h + stack_h,
                w: side_w,
                h: memory_h,
            },
        }
    }
}

fn render_state(stdout: &mut Stdout, engine: &Engine, src: Option<&str>) -> Result<()> {
    let curr_cursor = ct::cursor::position()?;
    let snapshot = engine.snapshot();
    let layout = Layout::new(terminal::size()?, snapshot.execution_stack.len());
    render_src(stdout, &layout.source, src, engine)?;
    render_instructions(stdout, &layout.instructions, engine)?;
    render_stack(stdout, &layout.stack, &snapshot)?;
    render_memory(stdout, &layout.memory, &snapshot)?;
    ct::queue!(stdout, ct::cursor::MoveTo(curr_cursor.0, curr_cursor.1))?;
    Ok(())
}

/// keeps the current line in the upper third of the rect
fn render_src(stdout: &mut Stdout, rect: &Rect, src: Option<&str>, engine: &Engine) -> Result<()> {
    let Some(src) = src else {
        return rect.render(stdout, "source", ["(compiled program)".to_string()]);
    };
    let current = engine.current_range().map(|r| r.start.line);
    let skip = current
        .unwrap_or_default()
        .saturating_sub(rect.body_rows() / 3);
    let lines = src.lines().enumerate().skip(skip).map(|(i, line)| {
        let marker = if Some(i) == current { ">" } else { " " };
        format!("{}{:>4} {}", marker, i + 1, line)
    });
    rect.render(stdout, "source", lines)
}

/// the next instruction is always the first one shown
fn render_instructions(stdout: &mut Stdout, rect: &Rect, engine: &Engine) -> Result<()> {
    let ip = engine.frames().last().map(|f| f.ip).unwrap_or_default();
    let lines = engine
        .program()
        .instructions
        .iter()
        .enumerate()
        .skip(ip)
        .map(|(i, inst)| format!("{:>4} {:?}", i, inst.code));
    rect.render(stdout, "instructions", lines)
}

/// innermost frame first
fn render_stack(stdout: &mut Stdout, rect: &Rect, snapshot: &DebuggerSnapshot) -> Result<()> {
    let lines = snapshot
        .execution_stack
        .iter()
        .rev()
        .map(|f| format!("{} line {}", f.module, f.range.start.line + 1));
    rect.render(stdout, "call stack", lines)
}

fn render_memory(stdout: &mut Stdout, rect: &Rect, snapshot: &DebuggerSnapshot) -> Result<()> {
    let lines = snapshot
        .memory
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value));
    rect.render(stdout, "memory", lines)
}
