use std::cell::RefCell;
use std::rc::Rc;

use badred::call::{PaneTypeView, RedCall, RedResponse, SizingView};
use badred::editor::Editor;
use badred::error::RedError;
use badred::keymap::install_default_keymap;
use badred::pane::Frame;
use badred::script::scheduler::PassOutcome;
use badred::script::thread::{Outcome, Resume, Routine};

type Replies = Rc<RefCell<Vec<Result<RedResponse, RedError>>>>;

fn editor_with_default_keymap() -> Editor {
    let mut editor = Editor::new();
    let callbacks = editor.callbacks();
    install_default_keymap(&mut editor.hooks, &callbacks);
    editor.state.root_frame = Frame {
        x: 0,
        y: 0,
        rows: 24,
        cols: 80,
    };
    editor
}

/// Runs a call sequence as one script task, recording every reply.
fn run_calls(editor: &mut Editor, calls: Vec<RedCall>) -> Vec<Result<RedResponse, RedError>> {
    let replies: Replies = Rc::new(RefCell::new(Vec::new()));

    fn next(mut calls: std::vec::IntoIter<RedCall>, replies: Replies) -> Outcome {
        let Some(call) = calls.next() else {
            return Outcome::Finish(None);
        };
        Outcome::Yield(
            call,
            Box::new(move |input| {
                match input {
                    Resume::Reply(response) => replies.borrow_mut().push(Ok(response)),
                    Resume::Fault(err) => replies.borrow_mut().push(Err(err)),
                    Resume::Start | Resume::Hook(_) => {}
                }
                next(calls, replies)
            }),
        )
    }

    let task_replies = replies.clone();
    editor
        .scheduler
        .spawn_thread(Routine::boxed(move |_| next(calls.into_iter(), task_replies)));
    editor.run_until_idle().expect("pass completes");

    Rc::try_unwrap(replies)
        .map(RefCell::into_inner)
        .unwrap_or_default()
}

fn type_keys(editor: &mut Editor, keys: &[&str]) {
    for key in keys {
        editor.dispatch_key(*key);
    }
    editor.run_until_idle().expect("pass completes");
}

#[test]
fn insert_then_delete_should_count_codepoints_across_the_bridge() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::BufferInsert {
                buffer_id,
                content: "héllo".to_string(),
            },
            RedCall::BufferSetCursor {
                buffer_id,
                byte_index: 0,
                keep_col: false,
            },
            RedCall::BufferDelete {
                buffer_id,
                char_count: 2,
            },
            RedCall::BufferContent { buffer_id },
            RedCall::BufferCursor { buffer_id },
            RedCall::BufferLength { buffer_id },
        ],
    );

    assert_eq!(
        replies[2].as_ref().expect("delete succeeds"),
        &RedResponse::Text("hé".to_string())
    );
    assert_eq!(
        replies[3].as_ref().expect("content reads"),
        &RedResponse::Text("llo".to_string())
    );
    assert_eq!(
        replies[4].as_ref().expect("cursor reads"),
        &RedResponse::ByteIndex(0)
    );
    assert_eq!(
        replies[5].as_ref().expect("length reads"),
        &RedResponse::Count(3)
    );
}

#[test]
fn vertical_motion_should_keep_the_sticky_column_across_a_short_line() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::BufferInsert {
                buffer_id,
                content: "abc\n12\nxyz".to_string(),
            },
            RedCall::BufferSetCursor {
                buffer_id,
                byte_index: 2,
                keep_col: false,
            },
            RedCall::BufferSetCursorLine { buffer_id, line: 1 },
            RedCall::BufferCursor { buffer_id },
            RedCall::BufferSetCursorLine { buffer_id, line: 2 },
            RedCall::BufferCursor { buffer_id },
        ],
    );

    assert_eq!(
        replies[3].as_ref().expect("cursor reads"),
        &RedResponse::ByteIndex(6)
    );
    assert_eq!(
        replies[5].as_ref().expect("cursor reads"),
        &RedResponse::ByteIndex(9)
    );
}

#[test]
fn split_then_close_should_restore_the_original_pane() {
    let mut editor = editor_with_default_keymap();
    let original = editor.state.pane_tree.root();
    let shown_buffer = editor.state.active_buffer_id().expect("buffer resolves");

    let replies = run_calls(&mut editor, vec![RedCall::PaneVSplit { pane_id: original }]);
    let RedResponse::Pane(split) = replies[0].clone().expect("split succeeds") else {
        panic!("expected pane reply");
    };

    assert_eq!(editor.state.pane_tree.root(), split);
    assert_eq!(editor.state.active_pane, original);
    let second = editor
        .state
        .pane_tree
        .child_of(split, false)
        .expect("split exists")
        .expect("split has children");
    assert_eq!(
        editor
            .state
            .pane_tree
            .buffer_of(second)
            .expect("pane exists"),
        Some(shown_buffer)
    );

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::PaneType { pane_id: split },
            RedCall::PaneCloseChild {
                pane_id: split,
                first_child: false,
            },
        ],
    );
    assert_eq!(
        replies[0].as_ref().expect("type reads"),
        &RedResponse::PaneType(PaneTypeView::VSplit(SizingView::Percent {
            first_percent: 0.5
        }))
    );

    assert_eq!(editor.state.pane_tree.root(), original);
    assert_eq!(editor.state.active_pane, original);
    assert!(!editor.state.pane_tree.contains(split));
    assert!(!editor.state.pane_tree.contains(second));
}

#[test]
fn unmapped_keys_should_echo_into_the_active_buffer() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    type_keys(&mut editor, &["q"]);
    assert_eq!(editor.state.buffer(buffer_id).expect("buffer exists").content(), "q");

    type_keys(&mut editor, &["Enter", "é"]);
    assert_eq!(
        editor.state.buffer(buffer_id).expect("buffer exists").content(),
        "q\né"
    );

    // named keys without text are dropped, not echoed
    type_keys(&mut editor, &["Esc", "F5", "C+e"]);
    assert_eq!(
        editor.state.buffer(buffer_id).expect("buffer exists").content(),
        "q\né"
    );
}

#[test]
fn backspace_should_remove_the_codepoint_before_the_cursor() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    type_keys(&mut editor, &["a", "é", "Backspace"]);
    assert_eq!(editor.state.buffer(buffer_id).expect("buffer exists").content(), "a");

    // at the start of the buffer backspace is a no-op
    type_keys(&mut editor, &["Backspace", "Backspace"]);
    assert_eq!(editor.state.buffer(buffer_id).expect("buffer exists").content(), "");
    type_keys(&mut editor, &["Backspace"]);
    assert_eq!(editor.state.buffer(buffer_id).expect("buffer exists").content(), "");
}

#[test]
fn arrow_keys_should_move_with_a_sticky_column() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    run_calls(
        &mut editor,
        vec![
            RedCall::BufferInsert {
                buffer_id,
                content: "abc\n12\nxyz".to_string(),
            },
            RedCall::BufferSetCursor {
                buffer_id,
                byte_index: 2,
                keep_col: false,
            },
        ],
    );

    type_keys(&mut editor, &["Down", "Down"]);
    assert_eq!(editor.state.buffer(buffer_id).expect("buffer exists").cursor(), 9);

    type_keys(&mut editor, &["Left"]);
    assert_eq!(editor.state.buffer(buffer_id).expect("buffer exists").cursor(), 8);
    assert_eq!(
        editor
            .state
            .buffer(buffer_id)
            .expect("buffer exists")
            .sticky_column(),
        None
    );
}

#[test]
fn tab_should_honor_expand_tabs_option() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    type_keys(&mut editor, &["Tab"]);
    assert_eq!(
        editor.state.buffer(buffer_id).expect("buffer exists").content(),
        "\t"
    );

    run_calls(
        &mut editor,
        vec![RedCall::UpdateOptions {
            update: badred::editor::OptionsUpdate {
                tab_width: Some(2),
                expand_tabs: Some(true),
            },
        }],
    );
    type_keys(&mut editor, &["Tab"]);
    assert_eq!(
        editor.state.buffer(buffer_id).expect("buffer exists").content(),
        "\t  "
    );
}

#[test]
fn control_q_should_request_editor_exit() {
    let mut editor = editor_with_default_keymap();
    editor.dispatch_key("C+q");
    let outcome = editor.run_until_idle().expect("pass completes");
    assert_eq!(outcome, PassOutcome::Quit);
}

#[test]
fn pane_frames_should_tile_after_scripted_resizes() {
    let mut editor = editor_with_default_keymap();
    let original = editor.state.pane_tree.root();

    let replies = run_calls(&mut editor, vec![RedCall::PaneHSplit { pane_id: original }]);
    let RedResponse::Pane(split) = replies[0].clone().expect("split succeeds") else {
        panic!("expected pane reply");
    };
    let second = editor
        .state
        .pane_tree
        .child_of(split, false)
        .expect("split exists")
        .expect("split has children");

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::PaneSetSplitFixed {
                pane_id: split,
                size: 3,
                on_first: false,
            },
            RedCall::PaneFrame { pane_id: original },
            RedCall::PaneFrame { pane_id: second },
        ],
    );

    assert_eq!(
        replies[1].as_ref().expect("frame computes"),
        &RedResponse::Frame(Frame {
            x: 0,
            y: 0,
            rows: 21,
            cols: 80
        })
    );
    assert_eq!(
        replies[2].as_ref().expect("frame computes"),
        &RedResponse::Frame(Frame {
            x: 0,
            y: 21,
            rows: 3,
            cols: 80
        })
    );
}

#[test]
fn switching_backend_through_the_bridge_should_preserve_everything() {
    let mut editor = editor_with_default_keymap();
    let buffer_id = editor.state.active_buffer_id().expect("buffer resolves");

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::BufferInsert {
                buffer_id,
                content: "héllo\nworld".to_string(),
            },
            RedCall::BufferSetCursor {
                buffer_id,
                byte_index: 4,
                keep_col: false,
            },
            RedCall::BufferType { buffer_id },
            RedCall::BufferSetType {
                buffer_id,
                kind: badred::buffer::BufferKind::Naive,
            },
            RedCall::BufferSetType {
                buffer_id,
                kind: badred::buffer::BufferKind::Naive,
            },
            RedCall::BufferContent { buffer_id },
            RedCall::BufferCursor { buffer_id },
            RedCall::BufferType { buffer_id },
        ],
    );

    assert_eq!(
        replies[2].as_ref().expect("type reads"),
        &RedResponse::BufferType(badred::buffer::BufferKind::Gap)
    );
    assert_eq!(
        replies[5].as_ref().expect("content reads"),
        &RedResponse::Text("héllo\nworld".to_string())
    );
    assert_eq!(
        replies[6].as_ref().expect("cursor reads"),
        &RedResponse::ByteIndex(4)
    );
    assert_eq!(
        replies[7].as_ref().expect("type reads"),
        &RedResponse::BufferType(badred::buffer::BufferKind::Naive)
    );
}

#[test]
fn pane_navigation_calls_should_mirror_the_tree_shape() {
    let mut editor = editor_with_default_keymap();
    let original = editor.state.pane_tree.root();

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::PaneIsFirst { pane_id: original },
            RedCall::PaneVSplit { pane_id: original },
        ],
    );
    assert_eq!(
        replies[0].as_ref().expect("root parity reads"),
        &RedResponse::MaybeBool(None)
    );
    let RedResponse::Pane(split) = replies[1].clone().expect("split succeeds") else {
        panic!("expected pane reply");
    };

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::PaneIsFirst { pane_id: original },
            RedCall::PaneIndexUpFrom { pane_id: original },
            RedCall::PaneIndexDownFrom {
                pane_id: split,
                to_first: false,
            },
            RedCall::PaneIndexDownFrom {
                pane_id: original,
                to_first: true,
            },
        ],
    );
    assert_eq!(
        replies[0].as_ref().expect("parity reads"),
        &RedResponse::MaybeBool(Some(true))
    );
    assert_eq!(
        replies[1].as_ref().expect("parent reads"),
        &RedResponse::MaybePane(Some(split))
    );
    let RedResponse::MaybePane(Some(second)) = replies[2].clone().expect("child reads") else {
        panic!("expected pane reply");
    };
    assert_eq!(
        editor
            .state
            .pane_tree
            .is_first(second)
            .expect("pane exists"),
        Some(false)
    );
    // leaves have no children
    assert_eq!(
        replies[3].as_ref().expect("leaf child reads"),
        &RedResponse::MaybePane(None)
    );
}

#[test]
fn stale_pane_ids_should_answer_invalid_pane() {
    let mut editor = editor_with_default_keymap();
    let original = editor.state.pane_tree.root();

    let replies = run_calls(&mut editor, vec![RedCall::PaneVSplit { pane_id: original }]);
    let RedResponse::Pane(split) = replies[0].clone().expect("split succeeds") else {
        panic!("expected pane reply");
    };
    let second = editor
        .state
        .pane_tree
        .child_of(split, false)
        .expect("split exists")
        .expect("split has children");

    let replies = run_calls(
        &mut editor,
        vec![
            RedCall::PaneCloseChild {
                pane_id: split,
                first_child: false,
            },
            RedCall::PaneTopLine { pane_id: second },
        ],
    );
    let err = replies[1].clone().expect_err("stale id faults");
    assert_eq!(err.kind, badred::error::ErrorKind::InvalidPane);
}
