use crate::error::Result;
use crate::runner::{Invocation, ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted [`ProcessRunner`] for tests. Responses are handed out in order;
/// once the queue is empty every call succeeds with no output.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<VecDeque<ProcessOutput>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, code: i32, output: impl Into<String>) {
        self.responses.lock().unwrap().push_back(ProcessOutput {
            code,
            output: output.into(),
        });
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let response = self.responses.lock().unwrap().pop_front().unwrap_or_default();

        if let Some(path) = &invocation.tee {
            std::fs::write(path, &response.output)
                .map_err(|e| crate::error::PublishError::io(path, e))?;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_responses_in_order() {
        let mock = MockRunner::new();
        mock.add_response(0, "first\n");
        mock.add_response(4, "second\n");

        let inv = Invocation::new("packer", ["version"], "/tmp");
        assert_eq!(mock.run(&inv).await.unwrap().output, "first\n");
        assert_eq!(mock.run(&inv).await.unwrap().code, 4);
        assert!(mock.run(&inv).await.unwrap().success());
        assert_eq!(mock.calls().len(), 3);
        assert_eq!(mock.remaining_responses(), 0);
    }
}
