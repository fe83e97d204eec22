use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticLine {
    pub stream: Stream,
    pub text: String,
}

/// Bounded ring of the most recent backend output lines.
#[derive(Debug, Clone)]
pub struct DiagnosticBuffer {
    lines: VecDeque<DiagnosticLine>,
    capacity: usize,
}

impl DiagnosticBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, stream: Stream, text: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(DiagnosticLine {
            stream,
            text: text.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &DiagnosticLine> {
        self.lines.iter()
    }

    /// Last `n` lines of one stream, oldest first.
    pub fn tail(&self, stream: Stream, n: usize) -> Vec<String> {
        let mut tail: Vec<String> = self
            .lines
            .iter()
            .rev()
            .filter(|line| line.stream == stream)
            .take(n)
            .map(|line| line.text.clone())
            .collect();
        tail.reverse();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut buf = DiagnosticBuffer::new(3);
        for i in 0..5 {
            buf.push(Stream::Stdout, format!("line {}", i));
        }
        let texts: Vec<&str> = buf.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn tail_filters_by_stream() {
        let mut buf = DiagnosticBuffer::new(10);
        buf.push(Stream::Stdout, "starting");
        buf.push(Stream::Stderr, "warn a");
        buf.push(Stream::Stdout, "listening on 8000");
        buf.push(Stream::Stderr, "warn b");
        buf.push(Stream::Stderr, "fatal");

        assert_eq!(buf.tail(Stream::Stderr, 2), vec!["warn b", "fatal"]);
        assert_eq!(buf.tail(Stream::Stdout, 5), vec!["starting", "listening on 8000"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut buf = DiagnosticBuffer::new(0);
        buf.push(Stream::Stderr, "lost");
        assert!(buf.is_empty());
    }
}
