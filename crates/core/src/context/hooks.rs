//! Before/after execute hooks
//!
//! Hooks see the rendered request or the raw response and nothing else,
//! so they cannot reach back into the context that is draining.

use odatalink_domain::constants::HEADER_HTTP_METHOD;
use odatalink_domain::{HttpMethod, HttpResponse, QueryId, RequestOptions};

pub type RequestHook = Box<dyn FnMut(&mut RequestOptions) + Send>;
pub type ResponseHook = Box<dyn FnMut(&HttpResponse) + Send>;

/// Registration handle returned by every hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Which queries a hook fires for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    All,
    Query(QueryId),
}

impl HookScope {
    fn matches(&self, query: QueryId) -> bool {
        match self {
            Self::All => true,
            Self::Query(id) => *id == query,
        }
    }
}

/// Request hook tunnelling `method` through `POST` with an
/// `X-HTTP-Method` header, for servers that only accept one verb.
pub fn http_method_override(method: HttpMethod) -> impl FnMut(&mut RequestOptions) + Send {
    move |request: &mut RequestOptions| {
        request.method = HttpMethod::Post;
        request.set_header(HEADER_HTTP_METHOD, method.as_str());
    }
}

struct Hook<F> {
    id: HookId,
    scope: HookScope,
    once: bool,
    action: F,
}

#[derive(Default)]
pub(crate) struct HookRegistry {
    next_id: u64,
    before: Vec<Hook<RequestHook>>,
    after: Vec<Hook<ResponseHook>>,
}

impl HookRegistry {
    fn allocate(&mut self) -> HookId {
        self.next_id += 1;
        HookId(self.next_id)
    }

    pub fn add_before(&mut self, scope: HookScope, once: bool, action: RequestHook) -> HookId {
        let id = self.allocate();
        self.before.push(Hook { id, scope, once, action });
        id
    }

    pub fn add_after(&mut self, scope: HookScope, once: bool, action: ResponseHook) -> HookId {
        let id = self.allocate();
        self.after.push(Hook { id, scope, once, action });
        id
    }

    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.before.len() + self.after.len();
        self.before.retain(|hook| hook.id != id);
        self.after.retain(|hook| hook.id != id);
        before != self.before.len() + self.after.len()
    }

    /// Run matching request hooks in registration order.
    pub fn run_before(&mut self, query: QueryId, request: &mut RequestOptions) {
        let mut fired = Vec::new();
        for hook in self.before.iter_mut().filter(|hook| hook.scope.matches(query)) {
            (hook.action)(request);
            if hook.once {
                fired.push(hook.id);
            }
        }
        self.before.retain(|hook| !fired.contains(&hook.id));
    }

    /// Run matching response hooks in registration order.
    pub fn run_after(&mut self, query: QueryId, response: &HttpResponse) {
        let mut fired = Vec::new();
        for hook in self.after.iter_mut().filter(|hook| hook.scope.matches(query)) {
            (hook.action)(response);
            if hook.once {
                fired.push(hook.id);
            }
        }
        self.after.retain(|hook| !fired.contains(&hook.id));
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }
}
