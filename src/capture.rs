//! The offscreen scene capture and its read/write bindings.
//!
//! The captured scene is written by one pass and sampled by the following
//! ones. Binding it for either use takes `&mut self` and returns a guard, so
//! an image can never be a render target and a shader input at once: the
//! borrow checker rejects a second binding while the first is alive. Dropping
//! the guard (or handing it to `RenderBackend::release_scene_input`) unbinds.

/// What the capture image is currently bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Target,
    Input,
}

/// Offscreen image the scene is rendered into.
///
/// `R` is whatever the backend needs to draw into and sample from the image
/// (wgpu texture views, or nothing at all for a recording backend).
#[derive(Debug)]
pub struct CaptureImage<R> {
    resource: R,
    width: u32,
    height: u32,
    state: CaptureState,
}

impl<R> CaptureImage<R> {
    pub fn new(resource: R, width: u32, height: u32) -> Self {
        Self {
            resource,
            width,
            height,
            state: CaptureState::Idle,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Bind the image for writing.
    pub fn bind_as_target(&mut self) -> TargetBinding<'_, R> {
        self.state = CaptureState::Target;
        TargetBinding { image: self }
    }

    /// Bind the image for sampling.
    pub fn bind_as_input(&mut self) -> InputBinding<'_, R> {
        self.state = CaptureState::Input;
        InputBinding { image: self }
    }
}

/// The capture bound as the render target.
#[derive(Debug)]
pub struct TargetBinding<'a, R> {
    image: &'a mut CaptureImage<R>,
}

impl<R> TargetBinding<'_, R> {
    pub fn resource(&self) -> &R {
        &self.image.resource
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.size()
    }
}

impl<R> Drop for TargetBinding<'_, R> {
    fn drop(&mut self) {
        self.image.state = CaptureState::Idle;
    }
}

/// The capture bound as a shader input.
#[derive(Debug)]
pub struct InputBinding<'a, R> {
    image: &'a mut CaptureImage<R>,
}

impl<R> InputBinding<'_, R> {
    pub fn resource(&self) -> &R {
        &self.image.resource
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.size()
    }

    pub fn state(&self) -> CaptureState {
        self.image.state
    }
}

impl<R> Drop for InputBinding<'_, R> {
    fn drop(&mut self) {
        self.image.state = CaptureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_reset_on_drop() {
        let mut capture = CaptureImage::new("scene", 64, 32);
        assert_eq!(capture.state(), CaptureState::Idle);
        {
            let target = capture.bind_as_target();
            assert_eq!(*target.resource(), "scene");
            assert_eq!(target.size(), (64, 32));
        }
        assert_eq!(capture.state(), CaptureState::Idle);

        let input = capture.bind_as_input();
        assert_eq!(input.state(), CaptureState::Input);
        drop(input);
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_rebinding_after_release() {
        let mut capture = CaptureImage::new((), 8, 8);
        for _ in 0..3 {
            drop(capture.bind_as_target());
            let input = capture.bind_as_input();
            assert_eq!(input.state(), CaptureState::Input);
        }
        assert_eq!(capture.state(), CaptureState::Idle);
    }
}
