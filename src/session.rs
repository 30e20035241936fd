use anyhow::Result;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Assistant placeholder appended when the request fails (transport error,
/// non-2xx status, or a bad payload).
pub const CONNECT_ERROR_MESSAGE: &str = "⚠️ Error connecting to the server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single turn in the conversation. Ids are generated locally and never
/// reused; the log is append-only.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn user(content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content,
        }
    }

    fn assistant(content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content,
        }
    }
}

/// Conversation state for one run of the app: the message log, the pending
/// input line, and at most one in-flight request to the answer service.
///
/// The request lifecycle is single-flight: `begin_submit` refuses new work
/// while a request is outstanding, and results can only be committed by
/// joining the handle this session owns. Cancelling takes and aborts that
/// handle, so a late response has no way back into the log.
pub struct Session {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    /// Cursor position in `input`, as a char index.
    pub cursor: usize,
    loading: bool,
    task: Option<JoinHandle<Result<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            cursor: 0,
            loading: false,
            task: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True while there is unsent text or an outstanding request. Derived on
    /// every read; the UI uses it to emphasize the transcript.
    pub fn is_blur_active(&self) -> bool {
        !self.input.is_empty() || self.loading
    }

    /// Start a submission. Uses `text` if given, otherwise the pending input.
    /// Returns the query to dispatch after appending it as a user message and
    /// clearing the input, or `None` when busy or the text trims to nothing
    /// (both are silent no-ops, not errors).
    pub fn begin_submit(&mut self, text: Option<&str>) -> Option<String> {
        if self.loading {
            return None;
        }

        let resolved = text.unwrap_or(self.input.as_str());
        let query = resolved.trim().to_string();
        if query.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(query.clone()));
        self.input.clear();
        self.cursor = 0;
        self.loading = true;

        Some(query)
    }

    /// Store the spawned request task for the submission just begun.
    pub fn attach(&mut self, task: JoinHandle<Result<String>>) {
        self.task = Some(task);
    }

    /// Settle the in-flight request if it has finished. Success appends the
    /// answer as an assistant message; failure appends the error placeholder
    /// and is otherwise absorbed. A cancelled task appends nothing. Returns
    /// whether a settle happened so the caller can react (scroll, redraw).
    pub async fn try_settle(&mut self) -> bool {
        let task = match self.task.take() {
            Some(task) if task.is_finished() => task,
            Some(task) => {
                self.task = Some(task);
                return false;
            }
            None => return false,
        };

        match task.await {
            Ok(Ok(answer)) => {
                self.messages.push(ChatMessage::assistant(answer));
            }
            Ok(Err(err)) => {
                tracing::warn!("ask request failed: {err:#}");
                self.messages
                    .push(ChatMessage::assistant(CONNECT_ERROR_MESSAGE.to_string()));
            }
            Err(err) if err.is_cancelled() => {
                // Aborted request: discard the outcome entirely.
            }
            Err(err) => {
                tracing::warn!("ask task panicked: {err}");
                self.messages
                    .push(ChatMessage::assistant(CONNECT_ERROR_MESSAGE.to_string()));
            }
        }

        self.loading = false;
        true
    }

    /// Abort the in-flight request, if any, and return to idle. The dropped
    /// handle is the only path for the response to reach the log, so nothing
    /// stale can land afterwards.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.loading = false;
    }

    // Input editing. The cursor is a char index so multi-byte input stays
    // safe; conversions to byte offsets happen here only.

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
