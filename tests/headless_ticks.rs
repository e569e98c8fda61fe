//! End-to-end headless ticks.
//!
//! Drives the full per-frame pipeline (invoke root, solve layout,
//! compose, diff render) against an in-memory byte sink, no terminal
//! attached. Each test builds its own `Runtime` (plus an `InputRouter`
//! where input is involved), so cases stay independent.
//!
//! Run with: cargo test --test headless_ticks

use std::cell::RefCell;
use std::rc::Rc;

use glint_tui::{
    column, compose, effect, flush_sync, invoke_root, on_input, row, signal, solve, spacer, text,
    use_state, DiffRenderer, FrameBuffer, InputEvent, InputParser, InputRouter, KeyCode, Runtime,
    TermCaps, UiNode,
};

// =============================================================================
// HARNESS
// =============================================================================

/// One headless frame in render-loop order: invoke the root, solve at
/// `width` x `height`, compose, diff-render into `sink`, then drain the
/// effect queue once.
fn render_tick(
    root: &mut impl FnMut() -> UiNode,
    renderer: &mut DiffRenderer,
    width: u16,
    height: u16,
    sink: &mut Vec<u8>,
) -> FrameBuffer {
    let tree = invoke_root(|| root());
    let layout = solve(&tree, width, height);
    let (frame, _hits) = compose(&layout, &TermCaps::default(), width, height);
    renderer
        .render(&frame, sink)
        .expect("a Vec sink cannot fail");
    flush_sync();
    frame
}

/// Rows named by the `ESC[row;colH` cursor moves in `bytes`, one entry
/// per emitted run. Rows are 1-based as on the wire.
fn cup_rows(bytes: &[u8]) -> Vec<u16> {
    let mut rows = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == 0x1b && bytes[i + 1] == b'[' {
            let start = i + 2;
            let mut end = start;
            while end < bytes.len() && !bytes[end].is_ascii_alphabetic() {
                end += 1;
            }
            if end < bytes.len() && bytes[end] == b'H' {
                let params = std::str::from_utf8(&bytes[start..end]).expect("ascii params");
                if let Some((r, _col)) = params.split_once(';') {
                    rows.push(r.parse().expect("numeric row"));
                }
            }
            i = end + 1;
        } else {
            i += 1;
        }
    }
    rows
}

/// The glyphs of row `y` as a string, wide-char continuations skipped.
fn row_text(frame: &FrameBuffer, y: u16) -> String {
    (0..frame.width())
        .filter_map(|x| frame.get(x, y))
        .filter(|cell| cell.char != 0)
        .map(|cell| char::from_u32(cell.char).expect("valid codepoint"))
        .collect()
}

// =============================================================================
// REACTIVE BATCHING
// =============================================================================

#[test]
fn one_write_reruns_each_reader_exactly_once() {
    let rt = Runtime::new();
    rt.enter(|| {
        let cell = signal(0);
        let runs = Rc::new(RefCell::new(vec![0u32; 3]));
        let seen = Rc::new(RefCell::new(vec![0i32; 3]));
        for i in 0..3 {
            let (runs, seen) = (runs.clone(), seen.clone());
            let _e = effect(move || {
                runs.borrow_mut()[i] += 1;
                seen.borrow_mut()[i] = cell.get();
            });
        }
        assert_eq!(*runs.borrow(), vec![1, 1, 1]);

        cell.set(5);
        flush_sync();
        assert_eq!(*runs.borrow(), vec![2, 2, 2], "one re-run per reader");
        assert_eq!(*seen.borrow(), vec![5, 5, 5]);
    });
}

// =============================================================================
// DETERMINISM
// =============================================================================

fn first_frame_bytes(build: fn() -> UiNode) -> Vec<u8> {
    let rt = Runtime::new();
    rt.enter(|| {
        let mut root = build;
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut sink = Vec::new();
        render_tick(&mut root, &mut renderer, 40, 12, &mut sink);
        sink
    })
}

#[test]
fn static_tree_renders_identical_bytes_across_runs() {
    fn build() -> UiNode {
        column()
            .child(text("header"))
            .child(row().child(text("left")).child(spacer()).child(text("right")))
            .child(text("footer"))
    }
    let a = first_frame_bytes(build);
    let b = first_frame_bytes(build);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

// =============================================================================
// DIFF LOCALITY
// =============================================================================

#[test]
fn single_leaf_edit_touches_only_its_rows() {
    let rt = Runtime::new();
    rt.enter(|| {
        let middle = signal("beta");
        let mut root = move || {
            column()
                .child(text("alpha"))
                .child(text(middle.get()))
                .child(text("gamma"))
        };
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut sink = Vec::new();
        render_tick(&mut root, &mut renderer, 20, 6, &mut sink);

        middle.set("betz");
        sink.clear();
        let frame = render_tick(&mut root, &mut renderer, 20, 6, &mut sink);
        assert_eq!(row_text(&frame, 1).trim_end(), "betz");

        // The edited leaf is the column's second row, so every cursor
        // move of the second frame must land on wire row 2.
        let rows = cup_rows(&sink);
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|&r| r == 2), "touched rows {rows:?}");
    });
}

// =============================================================================
// RESIZE
// =============================================================================

#[test]
fn resize_repaints_everything() {
    let rt = Runtime::new();
    rt.enter(|| {
        let mut root = || column().child(text("unchanged"));
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut sink = Vec::new();
        render_tick(&mut root, &mut renderer, 80, 24, &mut sink);

        // Same content at the new size. The previous buffer no longer
        // applies, so the bytes match what a fresh renderer emits.
        renderer.invalidate();
        sink.clear();
        render_tick(&mut root, &mut renderer, 100, 30, &mut sink);

        let mut fresh = DiffRenderer::new(TermCaps::default());
        let mut fresh_sink = Vec::new();
        render_tick(&mut root, &mut fresh, 100, 30, &mut fresh_sink);
        assert_eq!(sink, fresh_sink);
    });
}

// =============================================================================
// LAYOUT SCENARIO
// =============================================================================

#[test]
fn spacer_between_two_texts_fills_the_gap() {
    let rt = Runtime::new();
    rt.enter(|| {
        let mut root = || {
            row()
                .width(10)
                .child(text("A"))
                .child(spacer())
                .child(text("B"))
        };
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut sink = Vec::new();
        let frame = render_tick(&mut root, &mut renderer, 80, 24, &mut sink);
        assert_eq!(&row_text(&frame, 0)[..10], "A        B");
    });
}

// =============================================================================
// STATE ACROSS TICKS
// =============================================================================

#[test]
fn slot_state_survives_reinvocation() {
    let rt = Runtime::new();
    rt.enter(|| {
        let hoisted = Rc::new(RefCell::new(None));
        let out = hoisted.clone();
        let mut root = move || {
            let count = use_state(|| 41);
            *out.borrow_mut() = Some(count);
            text(format!("count={}", count.get()))
        };
        let mut renderer = DiffRenderer::new(TermCaps::default());
        let mut sink = Vec::new();
        let frame = render_tick(&mut root, &mut renderer, 20, 3, &mut sink);
        assert_eq!(row_text(&frame, 0).trim_end(), "count=41");

        // Writing through the hoisted handle, then re-invoking: the
        // slot keeps the written value, the initializer does not rerun.
        hoisted.borrow().unwrap().set(42);
        let frame = render_tick(&mut root, &mut renderer, 20, 3, &mut sink);
        assert_eq!(row_text(&frame, 0).trim_end(), "count=42");

        let frame = render_tick(&mut root, &mut renderer, 20, 3, &mut sink);
        assert_eq!(row_text(&frame, 0).trim_end(), "count=42");
    });
}

// =============================================================================
// INPUT TO FRAME
// =============================================================================

#[test]
fn decoded_key_drives_the_next_frame() {
    let rt = Runtime::new();
    rt.enter(|| {
        let router = InputRouter::new();
        router.enter(|| {
            let pressed = signal(0u32);
            let _id = on_input(move |event| {
                if let InputEvent::Key(k) = event {
                    if k.code == KeyCode::Up && k.is_press() {
                        pressed.update(|n| *n += 1);
                        return true;
                    }
                }
                false
            });

            let mut root = move || text(format!("ups={}", pressed.get()));
            let mut renderer = DiffRenderer::new(TermCaps::default());
            let mut sink = Vec::new();
            let frame = render_tick(&mut root, &mut renderer, 20, 3, &mut sink);
            assert_eq!(row_text(&frame, 0).trim_end(), "ups=0");

            let mut parser = InputParser::new();
            for event in parser.parse(b"\x1b[A\x1b[A") {
                router.route(&event);
            }
            let frame = render_tick(&mut root, &mut renderer, 20, 3, &mut sink);
            assert_eq!(row_text(&frame, 0).trim_end(), "ups=2");
        });
    });
}
