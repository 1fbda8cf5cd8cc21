//! Command registry and batch dispatcher.
//!
//! The registry is populated once at startup and shared read-only between
//! every in-flight request; the pending-instruction queue lives in a
//! per-request [`DispatchContext`], so concurrent requests never serialize
//! behind one lock or leak instructions into each other.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::{ProtocolError, Result};
use crate::protocol::auth::AuthGate;
use crate::protocol::instruction::Instruction;
use crate::protocol::script::CallStackGuard;
use crate::store::UserId;

/// A named operation executable by the dispatcher.
///
/// Handlers return one result line. A leading `!` marks an error line for
/// the caller's benefit; the dispatcher passes it through as opaque payload.
pub trait CommandHandler: Send + Sync {
    fn run(&self, args: &[String], ctx: &mut DispatchContext) -> Result<String>;
}

/// Immutable mapping from command name to handler, with a parallel set of
/// names that require an authenticated caller.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<Cow<'static, str>, Arc<dyn CommandHandler>>,
    auth_required: HashSet<Cow<'static, str>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler under `name`. Names are case-sensitive and unique;
    /// a repeated registration replaces the earlier handler.
    pub fn register(
        &mut self,
        name: &'static str,
        handler: Arc<dyn CommandHandler>,
        requires_auth: bool,
    ) {
        self.handlers.insert(Cow::Borrowed(name), handler);
        if requires_auth {
            self.auth_required.insert(Cow::Borrowed(name));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn requires_auth(&self, name: &str) -> bool {
        self.auth_required.contains(name)
    }
}

/// Per-request dispatch state: the private instruction queue, the script
/// call-stack guard, collected canned prompt answers, the request's
/// credentials, and the identity verified from them (at most once).
pub struct DispatchContext {
    queue: VecDeque<Instruction>,
    pub guard: CallStackGuard,
    pub prompts: Vec<Option<String>>,
    credentials: Option<(String, String)>,
    identity: Option<UserId>,
    line: usize,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            guard: CallStackGuard::new(),
            prompts: Vec::new(),
            credentials: None,
            identity: None,
            line: 0,
        }
    }

    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((login.into(), password.into()));
        self
    }

    /// Queue one instruction line for the next drain. Blank lines are
    /// ignored.
    pub fn enqueue(&mut self, text: &str) {
        if let Some(instr) = Instruction::parse(text) {
            self.queue.push_back(instr);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(l, p)| (l.as_str(), p.as_str()))
    }

    pub fn identity(&self) -> Option<UserId> {
        self.identity
    }

    pub fn set_identity(&mut self, identity: UserId) {
        self.identity = Some(identity);
    }

    fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains a context's instruction queue through the shared registry.
pub struct Dispatcher {
    registry: Arc<Registry>,
    gate: AuthGate,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, gate: AuthGate) -> Self {
        Self { registry, gate }
    }

    /// Run every queued instruction in enqueue order and return the combined
    /// output, one result line per instruction.
    ///
    /// Each wave of queued instructions is validated before any of it runs:
    /// the first unknown command name aborts the whole batch with its
    /// 1-based position, and no instruction executes. Instructions enqueued
    /// during execution (script expansion) form the next wave; the position
    /// counter runs across waves. An instruction whose handler reports a
    /// `!`-marked failure line also aborts the batch, with everything up to
    /// and including that line as the output. The queue is empty when this
    /// returns, win or lose.
    pub fn drain_and_run(&self, ctx: &mut DispatchContext) -> Result<String> {
        let result = self.drain_inner(ctx);
        if result.is_err() {
            ctx.clear();
        }
        ctx.line = 0;
        result
    }

    fn drain_inner(&self, ctx: &mut DispatchContext) -> Result<String> {
        let mut output = String::new();

        while !ctx.queue.is_empty() {
            for (offset, instr) in ctx.queue.iter().enumerate() {
                if !self.registry.contains(&instr.command) {
                    return Err(ProtocolError::UnknownCommand {
                        line: ctx.line + offset + 1,
                        text: instr.raw.clone(),
                    });
                }
            }

            let wave: Vec<Instruction> = ctx.queue.drain(..).collect();
            for instr in wave {
                ctx.line += 1;
                let Some(handler) = self.registry.get(&instr.command) else {
                    // Validated above; the registry is immutable.
                    return Err(ProtocolError::UnknownCommand {
                        line: ctx.line,
                        text: instr.raw,
                    });
                };

                let mut args = instr.args;
                if self.registry.requires_auth(&instr.command) {
                    let uid = self.gate.authorize(ctx)?;
                    args.push(uid.to_string());
                }

                let line = handler.run(&args, ctx)?;
                let failed = line.starts_with('!');
                output.push_str(&line);
                output.push('\n');

                // A failed instruction aborts the rest of its batch, the
                // same way an unknown command does; its result line is
                // still part of the output.
                if failed {
                    ctx.clear();
                    return Ok(output);
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::MemoryStore;

    struct Echo;

    impl CommandHandler for Echo {
        fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
            Ok(format!("echo {}", args.join(" ")))
        }
    }

    struct Fail;

    impl CommandHandler for Fail {
        fn run(&self, _args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
            Ok("! boom".to_string())
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = Registry::new();
        registry.register("echo", Arc::new(Echo), false);
        registry.register("fail", Arc::new(Fail), false);
        Dispatcher::new(
            Arc::new(registry),
            AuthGate::new(Arc::new(MemoryStore::new())),
        )
    }

    #[test]
    fn instructions_run_in_enqueue_order() {
        let dispatcher = dispatcher();
        let mut ctx = DispatchContext::new();
        ctx.enqueue("echo one");
        ctx.enqueue("echo two");

        let output = dispatcher.drain_and_run(&mut ctx).unwrap();
        assert_eq!(output, "echo one\necho two\n");
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn an_unknown_name_executes_nothing_and_reports_its_position() {
        let dispatcher = dispatcher();
        let mut ctx = DispatchContext::new();
        ctx.enqueue("echo one");
        ctx.enqueue("nope really");
        ctx.enqueue("echo three");

        let err = dispatcher.drain_and_run(&mut ctx).unwrap_err();
        match err {
            ProtocolError::UnknownCommand { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "nope really");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn a_failure_line_stops_the_batch_but_keeps_prior_output() {
        let dispatcher = dispatcher();
        let mut ctx = DispatchContext::new();
        ctx.enqueue("echo one");
        ctx.enqueue("fail");
        ctx.enqueue("echo never");

        let output = dispatcher.drain_and_run(&mut ctx).unwrap();
        assert_eq!(output, "echo one\n! boom\n");
        assert_eq!(ctx.pending(), 0);
    }
}
