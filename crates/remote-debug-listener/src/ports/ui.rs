use async_trait::async_trait;

/// Prompt and error surface of the hosting editor.
#[async_trait]
pub trait UiSurface: Send + Sync {
    /// Asks a yes/no question. May suspend until the user answers.
    async fn confirm(&self, message: &str) -> bool;

    /// Displays an error without waiting for acknowledgement.
    fn show_error(&self, message: &str);
}
