use crate::{
    lang::tokenizing::Tokenizer,
    runtime::{
        config::RuntimeConfig,
        data_structures::value::Value,
        error::{self, ErrorKind},
        interpreter::{
            CodeManagement, Interpreter, InterpreterStack, ProcessManagement, runtime::Runtime,
            scope::Scope,
        },
        lock,
    },
};
use std::{
    io::{self, BufRead, Write},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

/// A complete, self contained instance of the language.  Owns a runtime context, a root scope bound
/// to it, and the input the read loop consumes.
///
/// Dropping the environment stops the root scope, which in turn cancels every process it spawned.
pub struct Environment {
    root: Scope,
    input: Option<Box<dyn BufRead + Send>>,
}

impl Environment {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Environment::with_config(input, output, RuntimeConfig::default())
    }

    pub fn with_config(
        input: impl BufRead + Send + 'static,
        output: impl Write + Send + 'static,
        config: RuntimeConfig,
    ) -> Self {
        let runtime = Runtime::new(output, config);
        let root = runtime.create_root();

        Environment {
            root,
            input: Some(Box::new(input)),
        }
    }

    /// A handle to the root scope.  Embedders use it to register operations or to inspect the
    /// stack.
    pub fn root(&self) -> Scope {
        self.root.clone()
    }

    /// The values on the root scope's stack, bottom first.
    pub fn stack(&self) -> error::Result<Vec<Value>> {
        self.root.stack_values()
    }

    /// Read the input token by token, executing each one as it is read.  Errors raised by a token
    /// are printed to the output and the loop carries on with the next one.  The loop ends at the
    /// end of the input or once the root scope has been stopped.
    pub fn run(&mut self) -> error::Result<()> {
        let input = match self.input.take() {
            Some(input) => input,
            None => return Ok(()),
        };

        let mut tokenizer = Tokenizer::new("<input>", input);

        while !self.root.is_stopped() {
            let token = match tokenizer.next_token()? {
                Some(token) => token,
                None => break,
            };

            if let Err(error) = self.root.execute(&token) {
                if error.kind() == ErrorKind::Stopped || self.root.is_stopped() {
                    break;
                }

                self.root.write_output(&format!("{}\n", error))?;
            }
        }

        Ok(())
    }

    /// Execute a string of source code in the root scope.  Unlike `run` the first error ends
    /// the evaluation and is returned.
    pub fn eval(&mut self, source: &str) -> error::Result<()> {
        self.root.process_source("<eval>", source)
    }

    /// Wait for every spawned process to finish.  Returns false if some were still running when
    /// the timeout expired.
    pub fn join_processes(&self, timeout: Duration) -> bool {
        let runtime = self.root.runtime();
        let deadline = Instant::now() + timeout;
        let interval = runtime
            .config()
            .receive_poll_interval
            .max(Duration::from_millis(1));

        loop {
            if runtime.live_processes() == 0 {
                return true;
            }

            if Instant::now() >= deadline {
                return false;
            }

            thread::sleep(interval);
        }
    }

    /// Stop the root scope, cancelling every process it spawned.
    pub fn shutdown(&mut self) {
        let _ = self.root.stop();
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// An in-memory output sink that can be shared with an environment and read back later.
#[derive(Clone, Default)]
pub struct SharedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.buffer)).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.buffer).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
