/// One-way flag behind the signup form. It only ever moves from open to
/// submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Signup {
    submitted: bool,
}

impl Signup {
    /// Marks the form as submitted. Returns `true` only for the call that
    /// made the transition, so callers can tie one-off side effects to it.
    pub fn submit(&mut self) -> bool {
        if self.submitted {
            return false;
        }
        self.submitted = true;
        true
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }
}
