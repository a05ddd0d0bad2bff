/// Receives the "show consent prompt" signal. Rendering is up to the embedder.
pub trait ConsentPrompt: Send + Sync {
    fn show(&self);
}

pub struct NoPrompt;

impl ConsentPrompt for NoPrompt {
    fn show(&self) {}
}
