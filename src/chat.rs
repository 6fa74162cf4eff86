use std::collections::VecDeque;

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Learner,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug)]
pub struct Transcript {
    lines: VecDeque<ChatLine>,
    max_lines: usize,
}

impl Transcript {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines,
        }
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.lines.push_back(ChatLine {
            speaker,
            text: text.into(),
        });
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&ChatLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(100)
    }
}

const CANNED_REPLIES: &[(&str, &str)] = &[
    (
        "hint",
        "Start with `mixer stop-all`, then `mixer play <clip>`. `lib clips` lists the clip names.",
    ),
    (
        "clip",
        "Use `if clip <name>` before playing a clip the model might not have.",
    ),
    (
        "camera",
        "`camera orbit --damping 0.1` lets you drag the view around the character.",
    ),
    (
        "error",
        "Errors name the line they happened on. Fix that line and press Run again.",
    ),
    (
        "solution",
        "Press \"Reveal solution\" under the editor to see a finished version.",
    ),
];

const FALLBACK_REPLY: &str =
    "I'm only a placeholder for now, the assistant isn't connected. Try asking for a hint.";

pub fn canned_reply(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    CANNED_REPLIES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, reply)| *reply)
        .unwrap_or(FALLBACK_REPLY)
}

/// Placeholder chat: replies come from a worker thread, never the network.
pub struct ChatWidget {
    message_tx: Sender<String>,
    reply_rx: Receiver<String>,
}

impl ChatWidget {
    pub fn new() -> Self {
        let (message_tx, message_rx) = unbounded::<String>();
        let (reply_tx, reply_rx) = unbounded::<String>();

        std::thread::spawn(move || {
            while let Ok(message) = message_rx.recv() {
                let reply = canned_reply(&message).to_string();
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
            log::debug!("Chat worker stopped");
        });

        Self {
            message_tx,
            reply_rx,
        }
    }

    pub fn send(&self, transcript: &mut Transcript, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        transcript.push(Speaker::Learner, message);
        if self.message_tx.send(message.to_string()).is_err() {
            log::warn!("Chat worker is gone, dropping message");
            transcript.push(Speaker::System, "Chat is unavailable.");
        }
    }

    pub fn poll(&self, transcript: &mut Transcript) -> usize {
        let mut count = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            transcript.push(Speaker::Assistant, reply);
            count += 1;
        }
        count
    }
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn keywords_pick_replies() {
        assert!(canned_reply("Any HINT please?").contains("mixer stop-all"));
        assert_eq!(canned_reply("hello"), FALLBACK_REPLY);
    }

    #[test]
    fn transcript_is_bounded() {
        let mut transcript = Transcript::new(3);
        for i in 0..5 {
            transcript.push(Speaker::System, format!("line {}", i));
        }
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.lines().next().unwrap().text, "line 2");
    }

    #[test]
    fn worker_replies_to_messages() {
        let chat = ChatWidget::new();
        let mut transcript = Transcript::default();

        chat.send(&mut transcript, "   ");
        assert!(transcript.is_empty());

        chat.send(&mut transcript, "need a hint");
        assert_eq!(transcript.last().unwrap().speaker, Speaker::Learner);

        let deadline = Instant::now() + Duration::from_secs(5);
        while chat.poll(&mut transcript) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let reply = transcript.last().unwrap();
        assert_eq!(reply.speaker, Speaker::Assistant);
        assert!(reply.text.contains("mixer play"));
    }
}
