//! Scoped launch helpers over loops and widgets

use crossbeam::channel;
use futures::executor::block_on;
use loopdispatch::runtime::{delay, Start};
use loopdispatch::toolkit::{EventLoopOptions, LoopError, LoopThread, Widget};
use loopdispatch::{
    dispatcher_for, launch_if_not_disposed, launch_if_not_disposed_with, read_if_not_disposed,
    ScopedLaunchError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn spawn(name: &str) -> LoopThread {
    LoopThread::spawn(EventLoopOptions::named(name)).unwrap()
}

#[test]
fn test_launch_on_live_widget() {
    let loop_thread = spawn("live-widget");
    let widget = Widget::new(loop_thread.event_loop(), "label");

    let target = widget.clone();
    let job = launch_if_not_disposed(&widget, async move {
        target.set_text("hello").unwrap();
        delay(Duration::from_millis(10)).await.unwrap();
        target.set_text("world").unwrap();
        target.text()
    })
    .unwrap();

    assert_eq!(block_on(job.join()), Ok(Ok("world".to_string())));
    // Off the loop thread the widget refuses access.
    assert_eq!(widget.text(), Err(LoopError::WrongThread));
}

#[test]
fn test_launch_on_disposed_widget() {
    let loop_thread = spawn("disposed-widget");
    let widget = Widget::new(loop_thread.event_loop(), "label");
    widget.dispose();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let job = launch_if_not_disposed(&widget, async move {
        flag.store(true, Ordering::SeqCst);
    });

    assert!(job.is_none());
    thread::sleep(Duration::from_millis(20));
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_launch_on_disposed_loop() {
    let mut loop_thread = spawn("disposed-loop");
    let widget = Widget::new(loop_thread.event_loop(), "label");
    loop_thread.close();

    assert!(launch_if_not_disposed(loop_thread.event_loop(), async {}).is_none());
    assert!(launch_if_not_disposed(&widget, async {}).is_none());
}

#[test]
fn test_launch_on_live_loop_runs_on_owner() {
    let loop_thread = spawn("live-loop");
    let job = launch_if_not_disposed(loop_thread.event_loop(), async {
        thread::current().id()
    })
    .unwrap();

    assert_eq!(
        block_on(job.join()),
        Ok(loop_thread.event_loop().owner_thread())
    );
}

#[test]
fn test_lazy_start_is_rejected() {
    let loop_thread = spawn("lazy");
    let ran = Arc::new(AtomicBool::new(false));

    let flag = ran.clone();
    let result = launch_if_not_disposed_with(loop_thread.event_loop(), Start::Lazy, async move {
        flag.store(true, Ordering::SeqCst);
    });

    assert!(matches!(result, Err(ScopedLaunchError::LazyStart)));
    thread::sleep(Duration::from_millis(20));
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_undispatched_start() {
    let loop_thread = spawn("undispatched");
    let (tx, rx) = channel::bounded(1);

    let job = launch_if_not_disposed_with(loop_thread.event_loop(), Start::Undispatched, async move {
        tx.send(thread::current().id()).unwrap();
    })
    .unwrap()
    .unwrap();

    // The first segment ran on the calling thread.
    assert_eq!(rx.try_recv().unwrap(), thread::current().id());
    assert_eq!(block_on(job.join()), Ok(()));
}

#[test]
fn test_launch_with_on_disposed_resource() {
    let loop_thread = spawn("disposed-with");
    let widget = Widget::new(loop_thread.event_loop(), "label");
    widget.dispose();

    let result = launch_if_not_disposed_with(&widget, Start::Default, async {});
    assert!(matches!(result, Ok(None)));
}

#[test]
fn test_read_if_not_disposed() {
    let loop_thread = spawn("read");
    let widget = Widget::new(loop_thread.event_loop(), "label");

    let read = read_if_not_disposed(&widget).unwrap();
    assert!(std::ptr::eq(read, &widget));
    assert_eq!(read.name(), "label");

    widget.dispose();
    assert!(read_if_not_disposed(&widget).is_none());
    assert!(read_if_not_disposed(loop_thread.event_loop()).is_some());
}

#[test]
fn test_dispatcher_for_widget_matches_loop() {
    let loop_thread = spawn("dispatcher-for");
    let widget = Widget::new(loop_thread.event_loop(), "label");

    let from_widget = dispatcher_for(&widget);
    let from_loop = dispatcher_for(loop_thread.event_loop());

    assert_eq!(from_widget, from_loop);
    assert_eq!(from_widget.to_string(), "EventLoop-dispatcher-for");
}
