//! Typed callback lists that plugins tap into.
//!
//! Every tap is tagged with the name of the plugin that registered it so a
//! plugin can remove all of its taps at once when it is detached.

use futures::future::{join_all, LocalBoxFuture};

struct Tap<F: ?Sized> {
    plugin: String,
    callback: Box<F>,
}

macro_rules! tap_list {
    () => {
        /// Number of registered callbacks.
        pub fn len(&self) -> usize {
            self.taps.len()
        }

        pub fn is_empty(&self) -> bool {
            self.taps.is_empty()
        }

        /// Remove every callback registered by `plugin`.
        pub fn untap_all(&mut self, plugin: &str) -> usize {
            let before = self.taps.len();
            self.taps.retain(|t| t.plugin != plugin);
            before - self.taps.len()
        }

        /// Plugin names in tap order.
        pub fn tapped_by(&self) -> impl Iterator<Item = &str> {
            self.taps.iter().map(|t| t.plugin.as_str())
        }
    };
}

/// Calls every tap in order with the same argument.
pub struct SyncHook<A: ?Sized> {
    taps: Vec<Tap<dyn Fn(&A)>>,
}

impl<A: ?Sized> Default for SyncHook<A> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<A: ?Sized> SyncHook<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tap(&mut self, plugin: &str, callback: impl Fn(&A) + 'static) {
        self.taps.push(Tap {
            plugin: plugin.to_string(),
            callback: Box::new(callback),
        });
    }

    pub fn call(&self, args: &A) {
        for tap in &self.taps {
            (tap.callback)(args);
        }
    }

    /// Call only the taps registered by `plugin`.
    pub fn call_for(&self, plugin: &str, args: &A) {
        for tap in self.taps.iter().filter(|t| t.plugin == plugin) {
            (tap.callback)(args);
        }
    }

    tap_list!();
}

/// Threads a value through every tap. With no taps the result is `None`.
pub struct SyncWaterfallHook<T> {
    taps: Vec<Tap<dyn Fn(T) -> T>>,
}

impl<T> Default for SyncWaterfallHook<T> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<T> SyncWaterfallHook<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tap(&mut self, plugin: &str, callback: impl Fn(T) -> T + 'static) {
        self.taps.push(Tap {
            plugin: plugin.to_string(),
            callback: Box::new(callback),
        });
    }

    pub fn call(&self, initial: T) -> Option<T> {
        if self.taps.is_empty() {
            return None;
        }
        Some(self.taps.iter().fold(initial, |value, tap| (tap.callback)(value)))
    }

    tap_list!();
}

/// Starts every tap at once and waits for all of them.
pub struct AsyncParallelHook<A, R> {
    taps: Vec<Tap<dyn Fn(A) -> LocalBoxFuture<'static, R>>>,
}

impl<A, R> Default for AsyncParallelHook<A, R> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<A: Clone, R> AsyncParallelHook<A, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tap(&mut self, plugin: &str, callback: impl Fn(A) -> LocalBoxFuture<'static, R> + 'static) {
        self.taps.push(Tap {
            plugin: plugin.to_string(),
            callback: Box::new(callback),
        });
    }

    /// Results come back in tap order, whatever order the futures finish in.
    pub async fn call(&self, args: A) -> Vec<R> {
        join_all(self.taps.iter().map(|tap| (tap.callback)(args.clone()))).await
    }

    /// Like [`call`](Self::call) with each result paired with its plugin.
    pub async fn call_tagged(&self, args: A) -> Vec<(String, R)> {
        let results = self.call(args).await;
        self.taps
            .iter()
            .map(|t| t.plugin.clone())
            .zip(results)
            .collect()
    }

    /// Like [`call_tagged`](Self::call_tagged) but only starts the taps of
    /// `plugins`.
    pub async fn call_for(&self, plugins: &[String], args: A) -> Vec<(String, R)> {
        let taps: Vec<_> = self.taps.iter().filter(|t| plugins.contains(&t.plugin)).collect();
        let results = join_all(taps.iter().map(|tap| (tap.callback)(args.clone()))).await;
        taps.into_iter().map(|t| t.plugin.clone()).zip(results).collect()
    }

    tap_list!();
}

/// Awaits each tap in turn, feeding it the previous result. With no taps the
/// result is `None`.
pub struct AsyncSeriesWaterfallHook<T> {
    taps: Vec<Tap<dyn Fn(T) -> LocalBoxFuture<'static, T>>>,
}

impl<T> Default for AsyncSeriesWaterfallHook<T> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<T> AsyncSeriesWaterfallHook<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tap(&mut self, plugin: &str, callback: impl Fn(T) -> LocalBoxFuture<'static, T> + 'static) {
        self.taps.push(Tap {
            plugin: plugin.to_string(),
            callback: Box::new(callback),
        });
    }

    pub async fn call(&self, initial: T) -> Option<T> {
        if self.taps.is_empty() {
            return None;
        }
        let mut value = initial;
        for tap in &self.taps {
            value = (tap.callback)(value).await;
        }
        Some(value)
    }

    tap_list!();
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::future::FutureExt;

    use super::*;

    /// Resolves after being polled `n` extra times.
    async fn yield_times(n: usize) {
        for _ in 0..n {
            let mut yielded = false;
            futures::future::poll_fn(|cx| {
                if yielded {
                    std::task::Poll::Ready(())
                } else {
                    yielded = true;
                    cx.waker().wake_by_ref();
                    std::task::Poll::Pending
                }
            })
            .await;
        }
    }

    #[test]
    fn test_sync_hook_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hook: SyncHook<i32> = SyncHook::new();
        for label in ["a", "b"] {
            let sink = seen.clone();
            hook.tap(label, move |v: &i32| sink.borrow_mut().push(format!("{label}{v}")));
        }
        hook.call(&1);
        assert_eq!(*seen.borrow(), vec!["a1", "b1"]);
    }

    #[test]
    fn test_sync_waterfall() {
        let mut hook: SyncWaterfallHook<String> = SyncWaterfallHook::new();
        assert_eq!(hook.call("hello".to_string()), None);
        hook.tap("f1", |s: String| format!("{s} world"));
        hook.tap("f2", |s: String| s.to_uppercase());
        assert_eq!(hook.call("hello".to_string()).as_deref(), Some("HELLO WORLD"));
    }

    #[test]
    fn test_untap_all_removes_only_that_plugin() {
        let mut hook: SyncWaterfallHook<i32> = SyncWaterfallHook::new();
        hook.tap("double", |v: i32| v * 2);
        hook.tap("inc", |v: i32| v + 1);
        hook.tap("double", |v: i32| v * 2);
        assert_eq!(hook.untap_all("double"), 2);
        assert_eq!(hook.call(1), Some(2));
        assert_eq!(hook.tapped_by().collect::<Vec<_>>(), vec!["inc"]);
    }

    #[test]
    fn test_async_parallel_keeps_tap_order() {
        let finished = Rc::new(RefCell::new(Vec::new()));
        let mut hook: AsyncParallelHook<u32, &'static str> = AsyncParallelHook::new();
        for (label, delay) in [("slow", 5usize), ("fast", 0)] {
            let sink = finished.clone();
            hook.tap(label, move |_: u32| {
                let sink = sink.clone();
                async move {
                    yield_times(delay).await;
                    sink.borrow_mut().push(label);
                    label
                }
                .boxed_local()
            });
        }
        let results = pollster::block_on(hook.call(0));
        assert_eq!(results, vec!["slow", "fast"]);
        assert_eq!(*finished.borrow(), vec!["fast", "slow"]);
    }

    #[test]
    fn test_call_for_selects_plugin_taps() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hook: SyncHook<i32> = SyncHook::new();
        for label in ["a", "b", "a"] {
            let sink = seen.clone();
            hook.tap(label, move |v: &i32| sink.borrow_mut().push(format!("{label}{v}")));
        }
        hook.call_for("a", &2);
        assert_eq!(*seen.borrow(), vec!["a2", "a2"]);

        let mut hook: AsyncParallelHook<(), u32> = AsyncParallelHook::new();
        hook.tap("a", |_: ()| async { 1 }.boxed_local());
        hook.tap("b", |_: ()| async { 2 }.boxed_local());
        hook.tap("c", |_: ()| async { 3 }.boxed_local());
        let results = pollster::block_on(hook.call_for(&["c".to_string(), "a".to_string()], ()));
        assert_eq!(results, vec![("a".to_string(), 1), ("c".to_string(), 3)]);
    }

    #[test]
    fn test_async_series_waterfall() {
        let mut hook: AsyncSeriesWaterfallHook<i32> = AsyncSeriesWaterfallHook::new();
        assert_eq!(pollster::block_on(hook.call(3)), None);
        hook.tap("add", |v: i32| async move { v + 1 }.boxed_local());
        hook.tap("mul", |v: i32| {
            async move {
                yield_times(2).await;
                v * 10
            }
            .boxed_local()
        });
        assert_eq!(pollster::block_on(hook.call(3)), Some(40));
    }
}
