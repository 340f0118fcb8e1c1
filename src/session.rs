use crate::config::Config;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::output::{strip_sentinel, LineFilter};
use crate::prompt;
use crate::providers::LlmProvider;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Why an interactive session ended. All of these are clean exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    EndOfInput,
    Logout,
    Interrupted,
}

enum Step {
    Continue,
    End(Exit),
}

pub struct Session {
    provider: Box<dyn LlmProvider>,
    conversation: Conversation,
    prompt: String,
    stream: bool,
}

impl Session {
    pub fn new(provider: Box<dyn LlmProvider>, config: &Config) -> Self {
        let system_prompt = prompt::build_system_prompt(
            &config.os,
            &config.username,
            &config.hostname,
            config.system_prompt.as_deref(),
        );

        Self {
            provider,
            conversation: Conversation::new(system_prompt),
            prompt: prompt::initial_prompt(&config.username, &config.hostname),
            stream: config.stream,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Sends one command and prints the reply without the sentinel line.
    /// The printed text is recorded as the assistant's answer and returned.
    pub async fn execute(&mut self, command: &str, out: &mut (dyn Write + Send)) -> Result<String> {
        tracing::info!(command, "user");
        self.conversation.push_user(command);

        let lines = if self.stream {
            let mut filter = LineFilter::new(out);
            self.provider
                .stream_completion(self.conversation.messages(), &mut filter)
                .await?;
            filter.finish()?
        } else {
            let response = self.provider.complete(self.conversation.messages()).await?;
            let lines = strip_sentinel(&response);
            for line in &lines {
                writeln!(out, "{}", line)?;
            }
            out.flush()?;
            lines
        };

        let answer = lines.join("\n");
        tracing::info!(output = %answer, "ai");
        self.conversation.push_assistant(answer.clone());
        Ok(answer)
    }

    /// Runs a single command with no prompt decoration.
    pub async fn run_one_shot(&mut self, command: &str, out: &mut (dyn Write + Send)) -> Result<()> {
        self.execute(command, out).await?;
        tracing::info!(reason = "one-shot", "session end");
        Ok(())
    }

    /// Reads commands from `input` until it closes, the user logs out, or
    /// `shutdown` resolves. A request still in flight when `shutdown`
    /// resolves is abandoned.
    pub async fn run_interactive<R, S>(
        &mut self,
        mut input: R,
        out: &mut (dyn Write + Send),
        shutdown: S,
    ) -> Result<Exit>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.show_prompt(out)?;

        loop {
            let step = tokio::select! {
                _ = &mut shutdown => None,
                step = self.step(&mut input, &mut *out) => Some(step),
            };

            let exit = match step {
                Some(Ok(Step::Continue)) => continue,
                Some(Ok(Step::End(exit))) => exit,
                Some(Err(e)) => return Err(e),
                None => Exit::Interrupted,
            };

            // `exit` typed at the prompt already moved to a fresh line
            if exit != Exit::Logout {
                writeln!(out)?;
            }
            writeln!(out, "logout")?;
            out.flush()?;

            tracing::info!(reason = ?exit, "session end");
            return Ok(exit);
        }
    }

    async fn step<R>(&mut self, input: &mut R, out: &mut (dyn Write + Send)) -> Result<Step>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            return Ok(Step::End(Exit::EndOfInput));
        }

        let command = line.trim_end_matches(['\n', '\r']);
        match command.trim() {
            "" => {}
            "exit" | "logout" => return Ok(Step::End(Exit::Logout)),
            _ => {
                self.execute(command, out).await?;
            }
        }

        self.show_prompt(out)?;
        Ok(Step::Continue)
    }

    fn show_prompt(&self, out: &mut (dyn Write + Send)) -> Result<()> {
        write!(out, "{} ", self.prompt)?;
        out.flush()?;
        Ok(())
    }
}
