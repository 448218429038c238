use anyhow::Result;
use std::sync::mpsc::{channel, Receiver, Sender};

/// What a streaming consumer receives over the channel.
#[derive(Debug)]
pub enum StreamerMessage {
    /// A decoded text piece, ready to display.
    Token(String),
    /// Generation finished; no further messages follow.
    End,
}

/// Receives token ids as the decoding loop produces them.
pub trait TokenStreamer {
    fn append(&mut self, token_id: u32) -> Result<()>;
    fn finalize(&mut self) -> Result<()>;
}

/// Turns a token id into a displayable piece of text. Returning `None` buffers
/// the token until enough context exists to decode it (byte-level BPE can
/// split characters across tokens).
pub type TokenDecodeFn = Box<dyn FnMut(u32) -> Result<Option<String>> + Send>;

/// Channel-backed streamer: decoded pieces are pushed to a receiver that a
/// consumer drains on its own thread. An [`StreamerMessage::End`] is sent
/// exactly once, on finalize.
pub struct AsyncTextStreamer {
    decode: TokenDecodeFn,
    sender: Sender<StreamerMessage>,
    ended: bool,
}

impl AsyncTextStreamer {
    pub fn new(decode: TokenDecodeFn) -> (Self, Receiver<StreamerMessage>) {
        let (sender, receiver) = channel();
        (
            Self {
                decode,
                sender,
                ended: false,
            },
            receiver,
        )
    }
}

impl TokenStreamer for AsyncTextStreamer {
    fn append(&mut self, token_id: u32) -> Result<()> {
        if let Some(piece) = (self.decode)(token_id)? {
            // A hung-up receiver is not an error for the generation loop.
            let _ = self.sender.send(StreamerMessage::Token(piece));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if !self.ended {
            self.ended = true;
            let _ = self.sender.send(StreamerMessage::End);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pieces_arrive_in_order_then_end() -> Result<()> {
        let (mut streamer, receiver) =
            AsyncTextStreamer::new(Box::new(|token_id| Ok(Some(token_id.to_string()))));

        streamer.append(3)?;
        streamer.append(5)?;
        streamer.finalize()?;

        let mut pieces = vec![];
        loop {
            match receiver.recv()? {
                StreamerMessage::Token(piece) => pieces.push(piece),
                StreamerMessage::End => break,
            }
        }
        assert_eq!(pieces, vec!["3", "5"]);
        Ok(())
    }

    #[test]
    fn finalize_sends_end_once() -> Result<()> {
        let (mut streamer, receiver) = AsyncTextStreamer::new(Box::new(|_| Ok(None)));

        streamer.finalize()?;
        streamer.finalize()?;
        drop(streamer);

        assert!(matches!(receiver.recv()?, StreamerMessage::End));
        assert!(receiver.recv().is_err());
        Ok(())
    }

    #[test]
    fn buffered_tokens_send_nothing() -> Result<()> {
        let (mut streamer, receiver) = AsyncTextStreamer::new(Box::new(|_| Ok(None)));

        streamer.append(1)?;
        streamer.finalize()?;

        assert!(matches!(receiver.recv()?, StreamerMessage::End));
        Ok(())
    }
}
