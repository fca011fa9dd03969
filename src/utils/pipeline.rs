//! Ordered middleware chain with context passing and short-circuit support.
//! Handlers run in ascending priority (stable within equal priority); each
//! receives the context and a `next` continuation. Skipping `next`
//! short-circuits the rest of the chain.

use std::sync::Arc;

type HandlerFn<Ctx> = dyn Fn(&mut Ctx, &mut dyn FnMut(&mut Ctx)) + Send + Sync;

struct Entry<Ctx> {
    name: String,
    handler: Arc<HandlerFn<Ctx>>,
    priority: i32,
    order: usize,
}

pub struct Pipeline<Ctx> {
    entries: Vec<Entry<Ctx>>,
    insert_order: usize,
    dirty: bool,
}

impl<Ctx> Default for Pipeline<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> Pipeline<Ctx> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            insert_order: 0,
            dirty: false,
        }
    }

    pub fn add_handler<F>(&mut self, handler: F, priority: i32)
    where
        F: Fn(&mut Ctx, &mut dyn FnMut(&mut Ctx)) + Send + Sync + 'static,
    {
        self.add_named_handler("", handler, priority);
    }

    pub fn add_named_handler<F>(&mut self, name: &str, handler: F, priority: i32)
    where
        F: Fn(&mut Ctx, &mut dyn FnMut(&mut Ctx)) + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: name.to_string(),
            handler: Arc::new(handler),
            priority,
            order: self.insert_order,
        });
        self.insert_order += 1;
        self.dirty = true;
    }

    pub fn remove_handler(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        let removed = self.entries.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn handler_count(&self) -> usize {
        self.entries.len()
    }

    pub fn execute(&mut self, ctx: &mut Ctx) {
        self.ensure_sorted();
        let handlers: Vec<Arc<HandlerFn<Ctx>>> =
            self.entries.iter().map(|e| Arc::clone(&e.handler)).collect();

        fn run_at<Ctx>(handlers: &[Arc<HandlerFn<Ctx>>], index: usize, ctx: &mut Ctx) {
            if let Some(handler) = handlers.get(index) {
                let handler = handler.as_ref();
                handler(ctx, &mut |ctx| run_at(handlers, index + 1, ctx));
            }
        }

        run_at(&handlers, 0, ctx);
    }

    fn ensure_sorted(&mut self) {
        if !self.dirty {
            return;
        }
        self.entries.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.order.cmp(&b.order))
        });
        self.dirty = false;
    }
}
