//! Bounded queue for frames that arrive while an utterance is processing.
//!
//! Queued audio is capped at the upload limit. Binary frames past the cap are
//! dropped and replaced by one [`Queued::Overflow`] marker per utterance, so the
//! session still reports `audio_too_large` on the matching `stop`.

use std::collections::VecDeque;

use axum::extract::ws::Message;

/// Frames that may wait behind an in-flight utterance
pub const MAX_PENDING_FRAMES: usize = 512;

#[derive(Debug)]
pub enum Queued {
    Frame(Message),
    /// Audio was dropped here
    Overflow,
}

/// The queue already holds [`MAX_PENDING_FRAMES`] frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklogFull;

#[derive(Debug)]
pub struct Backlog {
    items: VecDeque<Queued>,
    audio_bytes: usize,
    max_audio_bytes: usize,
    dropping: bool,
}

impl Backlog {
    pub fn new(max_audio_bytes: usize) -> Self {
        Self {
            items: VecDeque::new(),
            audio_bytes: 0,
            max_audio_bytes,
            dropping: false,
        }
    }

    pub fn push(&mut self, msg: Message) -> Result<(), BacklogFull> {
        if self.items.len() >= MAX_PENDING_FRAMES {
            return Err(BacklogFull);
        }

        match &msg {
            Message::Binary(data) => {
                if self.dropping {
                    return Ok(());
                }
                if self.audio_bytes + data.len() > self.max_audio_bytes {
                    self.dropping = true;
                    self.items.push_back(Queued::Overflow);
                    return Ok(());
                }
                self.audio_bytes += data.len();
            }
            // A control frame ends the utterance the dropped audio belonged to
            Message::Text(_) => self.dropping = false,
            _ => {}
        }

        self.items.push_back(Queued::Frame(msg));
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Queued> {
        let item = self.items.pop_front()?;
        if let Queued::Frame(Message::Binary(data)) = &item {
            self.audio_bytes -= data.len();
        }
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn audio_bytes(&self) -> usize {
        self.audio_bytes
    }
}
