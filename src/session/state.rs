//! Top-level application state and its transitions.

use crate::error::Result;
use crate::image::{
    AspectRatio, DataUri, GeneratedImage, GenerationMode, GenerationRequest, ImageProvider,
};
use crate::session::history::SessionHistory;
use uuid::Uuid;

/// Shown when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Preconditions that block a submission before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A request is already in flight.
    #[error("A request is already in progress.")]
    Busy,
    /// The prompt is empty or whitespace.
    #[error("Please enter a prompt.")]
    BlankPrompt,
    /// Edit mode without a source image.
    #[error("Please upload or select an image to edit.")]
    MissingSourceImage,
}

/// How a submission that reached the service ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new history entry was created and is now displayed.
    Created(Uuid),
    /// The service call failed; the message is also stored in the state.
    Failed(String),
}

/// Everything the interaction surface shows and edits.
///
/// The displayed image is referenced by id into the history rather than
/// copied. All mutation goes through the methods below.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    mode: GenerationMode,
    prompt: String,
    aspect_ratio: AspectRatio,
    source_image: Option<DataUri>,
    is_generating: bool,
    current: Option<Uuid>,
    history: SessionHistory,
    error: Option<String>,
}

impl AppState {
    /// Creates the initial state: generate mode, square ratio, empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation mode.
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Prompt text as typed.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Selected aspect ratio.
    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// Image that edit requests will modify.
    pub fn source_image(&self) -> Option<&DataUri> {
        self.source_image.as_ref()
    }

    /// True while a request is in flight.
    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    /// Message of the last failure, until dismissed or resubmitted.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Results of this session.
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Id of the displayed image, if any.
    pub fn current_id(&self) -> Option<Uuid> {
        self.current
    }

    /// The displayed image, looked up in the history.
    pub fn current_image(&self) -> Option<&GeneratedImage> {
        self.current.and_then(|id| self.history.get(id))
    }

    /// Switches between generate and edit.
    pub fn set_mode(&mut self, mode: GenerationMode) {
        self.mode = mode;
    }

    /// Replaces the prompt text.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Only used by generate requests; kept while in edit mode.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Sets the image to edit (upload or quick edit).
    pub fn set_source_image(&mut self, image: DataUri) {
        self.source_image = Some(image);
    }

    /// Removes the image to edit.
    pub fn clear_source_image(&mut self) {
        self.source_image = None;
    }

    /// Hides the error message.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Whether the submit action is currently enabled.
    pub fn can_generate(&self) -> bool {
        !self.is_generating
            && !self.prompt.trim().is_empty()
            && (self.mode == GenerationMode::Generate || self.source_image.is_some())
    }

    /// Validates the inputs and enters the in-flight state.
    ///
    /// On success the error and the displayed image are cleared, and the
    /// request to send is returned. On failure no request may be sent; the
    /// validation message is stored as the error unless a request is already
    /// running.
    pub fn begin_submit(&mut self) -> std::result::Result<GenerationRequest, ValidationError> {
        if self.is_generating {
            return Err(ValidationError::Busy);
        }

        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("submission blocked: {e}");
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.is_generating = true;
        self.error = None;
        self.current = None;
        Ok(request)
    }

    fn build_request(&self) -> std::result::Result<GenerationRequest, ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::BlankPrompt);
        }
        match self.mode {
            GenerationMode::Generate => Ok(GenerationRequest::generate(
                self.prompt.clone(),
                self.aspect_ratio,
            )),
            GenerationMode::Edit => {
                let source = self
                    .source_image
                    .clone()
                    .ok_or(ValidationError::MissingSourceImage)?;
                Ok(GenerationRequest::edit(self.prompt.clone(), source))
            }
        }
    }

    /// Leaves the in-flight state with the service's answer.
    ///
    /// Success prepends a new entry and displays it. Failure records the
    /// message and leaves history and display untouched.
    pub fn finish_submit(
        &mut self,
        request: &GenerationRequest,
        result: Result<DataUri>,
    ) -> SubmitOutcome {
        self.is_generating = false;

        let image = result.and_then(|url| GeneratedImage::from_request(request, url));
        match image {
            Ok(image) => {
                let id = image.id;
                tracing::debug!(%id, mode = %request.mode(), "added image to history");
                self.history.append(image);
                self.current = Some(id);
                SubmitOutcome::Created(id)
            }
            Err(e) => {
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    UNKNOWN_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
                self.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Runs one full submission against `provider`.
    ///
    /// The provider call is the only await point. Validation failures return
    /// `Err` without calling the provider.
    pub async fn submit(
        &mut self,
        provider: &dyn ImageProvider,
    ) -> std::result::Result<SubmitOutcome, ValidationError> {
        let request = self.begin_submit()?;
        let result = provider.generate(&request).await;
        Ok(self.finish_submit(&request, result))
    }

    /// Displays a history entry without changing the history.
    ///
    /// Returns false if there is no entry with `id`.
    pub fn select(&mut self, id: Uuid) -> bool {
        if self.history.contains(id) {
            self.current = Some(id);
            true
        } else {
            false
        }
    }

    /// Deletes a history entry, clearing the display if it was shown.
    pub fn delete(&mut self, id: Uuid) -> Option<GeneratedImage> {
        let removed = self.history.remove(id)?;
        if self.current == Some(id) {
            self.current = None;
        }
        Some(removed)
    }

    /// Starts editing the displayed image.
    ///
    /// Switches to edit mode, uses the displayed image as the source and
    /// clears the prompt. Returns false when nothing is displayed.
    pub fn quick_edit(&mut self) -> bool {
        let Some(image_url) = self.current_image().map(|img| img.image_url.clone()) else {
            return false;
        };
        self.source_image = Some(image_url);
        self.mode = GenerationMode::Edit;
        self.prompt.clear();
        true
    }
}
