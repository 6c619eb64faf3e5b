/// `RunOnDrop` runs a function when it gets dropped, providing
/// a similar convention to go's defer.
///
/// The function also runs when the owning scope unwinds from a panic,
/// which is what workers rely on to always announce that they are done.
pub struct RunOnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> RunOnDrop<F> {
    #[must_use]
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }

    /// `cancel` disarms the guard, returning the function without running it.
    pub fn cancel(mut self) -> Option<F> {
        self.0.take()
    }
}

impl<F: FnOnce()> Drop for RunOnDrop<F> {
    fn drop(&mut self) {
        if let Some(cb) = self.0.take() {
            cb();
        }
    }
}
