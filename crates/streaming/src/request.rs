/// Identifies one load request.
///
/// Small and copyable so it can travel through async code and be compared
/// against the tracker when the load completes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

/// Issues request generations. Only the most recent one is current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
    current: Option<Request>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any earlier one.
    pub fn begin(&mut self) -> Request {
        self.latest += 1;
        let req = Request(self.latest);
        self.current = Some(req);
        req
    }

    pub fn is_current(&self, req: Request) -> bool {
        self.current == Some(req)
    }

    /// Mark the request finished. Does nothing if `req` was superseded.
    pub fn finish(&mut self, req: Request) -> bool {
        if self.is_current(req) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Supersede whatever is in flight without starting anything new.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    pub fn in_flight(&self) -> Option<Request> {
        self.current
    }
}
