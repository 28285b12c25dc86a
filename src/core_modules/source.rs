// THEORY:
// The `source` module defines the capability every image origin must offer.
// A source owns its own notion of "what have I already delivered": `poll`
// returns a handle at most once per distinct fingerprint, and `None`
// otherwise, so the scheduling layer never has to de-duplicate deliveries
// itself.
//
// `poll` is called once per scheduling tick and must stay bounded: a single
// filesystem or network probe, never an open-ended wait.

use std::time::Duration;

use crate::core_modules::pixel_buffer::ImageHandle;
use crate::errors::SourceError;

/// Capability interface for a configured origin of images.
pub trait ImageSource: Send {
    /// The configured, human-readable name of this source.
    fn name(&self) -> &str;

    /// How often the coordinator should tick this source.
    fn update_interval(&self) -> Duration;

    /// Called once before the first tick. Not fatal on failure; a source
    /// whose backing location is missing may become available later.
    fn start(&mut self);

    /// Called once at shutdown.
    fn stop(&mut self);

    /// Probes for a new image.
    ///
    /// Returns `Some(handle)` only when the newest image's fingerprint
    /// differs from the last one this source returned; an unchanged folder
    /// yields `None`, never a re-delivery.
    fn poll(&mut self) -> Result<Option<ImageHandle>, SourceError>;
}
