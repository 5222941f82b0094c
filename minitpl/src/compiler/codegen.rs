use crate::compiler::ast::{CondBranch, ControlOp, Expr, ForHead, Procedure, Step, Stmt};
use crate::error::{Error, ErrorKind};

const MAX_RECURSION: usize = 150;

/// Represents an open block of code that does not yet have a closing brace.
enum PendingBlock {
    Branch(Expr),
    ElseIf { head: Stmt, expr: Expr },
    Else { head: Stmt },
    While(Expr),
    For(ForHead),
}

struct Frame {
    block: PendingBlock,
    body: Vec<Stmt>,
}

fn syntax_error(msg: &'static str) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

/// Turns a flat step sequence into a [`Procedure`].
///
/// Control fragments only open and close blocks, so the generator keeps a
/// stack of pending blocks and attaches statements to the innermost one.
/// Block balance is validated here which means that a template with a
/// stray `}` or a missing one fails before anything is executed.
pub struct CodeGenerator {
    root: Vec<Stmt>,
    stack: Vec<Frame>,
    after_if: bool,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        CodeGenerator::new()
    }
}

impl CodeGenerator {
    /// Creates a new code generator.
    pub fn new() -> CodeGenerator {
        CodeGenerator {
            root: Vec::new(),
            stack: Vec::new(),
            after_if: false,
        }
    }

    fn current_body(&mut self) -> &mut Vec<Stmt> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.body,
            None => &mut self.root,
        }
    }

    fn push_stmt(&mut self, stmt: Stmt) {
        self.current_body().push(stmt);
    }

    fn open_block(&mut self, block: PendingBlock) -> Result<(), Error> {
        if self.stack.len() >= MAX_RECURSION {
            return Err(syntax_error("template exceeds maximum recursion limits"));
        }
        self.stack.push(Frame {
            block,
            body: Vec::new(),
        });
        Ok(())
    }

    /// Takes the conditional that was just closed so an `else` can extend it.
    fn take_closed_if(&mut self) -> Result<Stmt, Error> {
        let after_if = self.after_if;
        let body = self.current_body();
        match body.last() {
            Some(Stmt::IfCond { .. }) if after_if => {}
            _ => return Err(syntax_error("unexpected `else`")),
        }
        body.pop()
            .ok_or_else(|| syntax_error("unexpected `else`"))
    }

    fn close_block(&mut self) -> Result<(), Error> {
        let Frame { block, body } = match self.stack.pop() {
            Some(frame) => frame,
            None => return Err(syntax_error("unexpected `}`")),
        };
        self.after_if = false;
        let stmt = match block {
            PendingBlock::Branch(expr) => {
                self.after_if = true;
                Stmt::IfCond {
                    branches: vec![CondBranch { expr, body }],
                    else_body: Vec::new(),
                }
            }
            PendingBlock::ElseIf { mut head, expr } => {
                if let Stmt::IfCond { ref mut branches, .. } = head {
                    branches.push(CondBranch { expr, body });
                }
                self.after_if = true;
                head
            }
            PendingBlock::Else { mut head } => {
                if let Stmt::IfCond {
                    ref mut else_body, ..
                } = head
                {
                    *else_body = body;
                }
                head
            }
            PendingBlock::While(expr) => Stmt::WhileLoop { expr, body },
            PendingBlock::For(ForHead::Classic { init, test, update }) => Stmt::ForLoop {
                init,
                test,
                update,
                body,
            },
            PendingBlock::For(ForHead::Each {
                binding,
                kind,
                iter,
            }) => Stmt::ForEach {
                binding,
                kind,
                iter,
                body,
            },
        };
        self.push_stmt(stmt);
        Ok(())
    }

    fn add_control_op(&mut self, op: ControlOp) -> Result<(), Error> {
        match op {
            ControlOp::Close => return self.close_block(),
            ControlOp::ElseIf(expr) => {
                let head = ok!(self.take_closed_if());
                ok!(self.open_block(PendingBlock::ElseIf { head, expr }));
            }
            ControlOp::Else => {
                let head = ok!(self.take_closed_if());
                ok!(self.open_block(PendingBlock::Else { head }));
            }
            ControlOp::If(expr) => ok!(self.open_block(PendingBlock::Branch(expr))),
            ControlOp::While(expr) => ok!(self.open_block(PendingBlock::While(expr))),
            ControlOp::For(head) => ok!(self.open_block(PendingBlock::For(head))),
            // an empty statement still separates `}` from a following `else`
            ControlOp::Empty => {}
        }
        self.after_if = false;
        Ok(())
    }

    /// Adds the next step of the template.
    pub fn add_step(&mut self, step: Step) -> Result<(), Error> {
        match step {
            Step::Literal(text) => {
                self.after_if = false;
                self.push_stmt(Stmt::EmitRaw(text));
            }
            Step::Expr(expr) => {
                self.after_if = false;
                self.push_stmt(Stmt::EmitExpr(expr));
            }
            Step::Control(ops) => {
                for op in ops {
                    ok!(self.add_control_op(op));
                }
            }
        }
        Ok(())
    }

    /// Finishes code generation and returns the procedure.
    pub fn finish(self) -> Result<Procedure, Error> {
        if !self.stack.is_empty() {
            return Err(syntax_error(
                "unexpected end of template, expected `}` to close block",
            ));
        }
        Ok(Procedure { body: self.root })
    }
}

/// Generates a procedure from a step sequence.
pub fn generate<I: IntoIterator<Item = Step>>(steps: I) -> Result<Procedure, Error> {
    let mut gen = CodeGenerator::new();
    for step in steps {
        ok!(gen.add_step(step));
    }
    gen.finish()
}
