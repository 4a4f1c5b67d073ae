//! End-to-end behaviour between whiteboards sharing an in-process hub.

use inksync_core::{Element, ElementId, ElementPatch, Point, Shape, Style, Tool};
use inksync_session::Session;
use inksync_sync::{
    Channel, Command, Delta, DeltaMessage, MemoryChannel, MemoryHub, Outcome, SyncConfig, Whiteboard,
};
use proptest::prelude::*;

fn board(hub: &MemoryHub, id: &str) -> Whiteboard<MemoryChannel> {
    let mut wb = Whiteboard::new(Session::with_client_id(id.into()), hub.connect(), &SyncConfig::default());
    // consume the initial Opened
    wb.poll_remote();
    wb
}

fn drag(wb: &mut Whiteboard<MemoryChannel>, tool: Tool, from: (f64, f64), to: (f64, f64)) -> ElementId {
    wb.execute(Command::PointerDown { tool, at: Point::new(from.0, from.1) }).unwrap();
    wb.execute(Command::PointerMove { at: Point::new(to.0, to.1) }).unwrap();
    match wb.execute(Command::PointerUp).unwrap() {
        Outcome::Committed { id: Some(id), .. } => id,
        other => panic!("gesture did not commit: {other:?}"),
    }
}

/// Send a raw delta into the hub as if from another client
fn inject(peer: &mut MemoryChannel, from: &str, delta: Delta) {
    peer.send(&DeltaMessage::new(from.into(), delta).encode().unwrap());
}

fn circle(id: &str, radius: f64) -> Element {
    Element::with_id(id.into(), Shape::Circle { x: 0.0, y: 0.0, radius }, &Style::default())
}

#[test]
fn rectangle_drawn_by_one_client_appears_on_another() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut b = board(&hub, "b");

    drag(&mut a, Tool::Rectangle, (10.0, 10.0), (50.0, 40.0));
    assert_eq!(a.engine().stats().sent, 1);

    let summary = b.poll_remote();
    assert_eq!(summary.applied, 1);
    assert_eq!(b.collection().len(), 1);
    assert_eq!(
        b.collection().elements()[0].shape,
        Shape::Rectangle { x: 10.0, y: 10.0, width: 40.0, height: 30.0 }
    );
    assert_eq!(b.collection(), a.collection());
}

#[test]
fn late_joiner_never_sees_deleted_element() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");

    a.execute(Command::PlaceText { at: Point::new(0.0, 0.0), text: "e1".into() }).unwrap();
    let id = a.collection().elements()[0].id.clone();
    a.execute(Command::Delete { id: id.clone() }).unwrap();

    let mut b = board(&hub, "b");
    b.poll_remote();
    assert!(!b.collection().contains(&id));
    assert!(b.collection().is_empty());
}

#[test]
fn empty_full_sync_resets_receiver() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut peer = hub.connect();

    drag(&mut a, Tool::Circle, (0.0, 0.0), (3.0, 4.0));
    a.execute(Command::PlaceSticky { at: Point::new(5.0, 5.0), text: "x".into() }).unwrap();
    assert_eq!(a.collection().len(), 2);

    inject(&mut peer, "c", Delta::Full { elements: vec![] });
    a.poll_remote();
    assert!(a.collection().is_empty());
}

#[test]
fn deleting_a_missing_element_twice_changes_nothing() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut peer = hub.connect();
    drag(&mut a, Tool::Ellipse, (0.0, 0.0), (2.0, 1.0));
    let before = a.collection().clone();

    for _ in 0..2 {
        inject(&mut peer, "c", Delta::Delete { id: "missing".into() });
        assert_eq!(a.poll_remote().applied, 0);
        assert_eq!(a.collection(), &before);
    }
}

#[test]
fn update_before_add_is_dropped_without_harm() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut peer = hub.connect();
    drag(&mut a, Tool::Rectangle, (0.0, 0.0), (1.0, 1.0));
    let mine = a.collection().elements()[0].clone();

    // in order: the update lands
    inject(&mut peer, "c", Delta::Add { element: circle("x", 1.0) });
    inject(&mut peer, "c", Delta::Update { element: circle("x", 9.0) });
    a.poll_remote();
    assert_eq!(a.collection().get(&"x".into()).unwrap().shape, circle("x", 9.0).shape);

    // reversed: the update is dropped, the later add wins
    inject(&mut peer, "c", Delta::Update { element: circle("y", 9.0) });
    inject(&mut peer, "c", Delta::Add { element: circle("y", 1.0) });
    a.poll_remote();
    assert_eq!(a.collection().get(&"y".into()).unwrap().shape, circle("y", 1.0).shape);

    assert_eq!(a.collection().elements()[0], mine);
    assert_eq!(a.collection().len(), 3);
}

#[test]
fn malformed_frames_do_not_disturb_state() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut peer = hub.connect();
    drag(&mut a, Tool::Pen, (0.0, 0.0), (1.0, 1.0));
    let before = a.collection().clone();

    peer.send("garbage");
    peer.send(r#"{"clientId":"c","type":"add","element":{"id":"q","type":"hexagon"}}"#);
    assert_eq!(a.poll_remote().applied, 0);
    assert_eq!(a.collection(), &before);
    assert_eq!(a.engine().stats().malformed, 2);
}

#[test]
fn remote_changes_are_not_undoable_locally() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut b = board(&hub, "b");

    drag(&mut a, Tool::Triangle, (0.0, 0.0), (4.0, 4.0));
    b.poll_remote();
    assert_eq!(b.collection().len(), 1);

    assert_eq!(b.execute(Command::Undo).unwrap(), Outcome::Unchanged);
    assert_eq!(b.history().undo_count(), 0);
    assert_eq!(b.collection().len(), 1);
}

#[test]
fn own_echoes_are_ignored_on_an_echoing_relay() {
    let hub = MemoryHub::with_echo();
    let mut a = board(&hub, "a");
    let id = drag(&mut a, Tool::Arrow, (0.0, 0.0), (5.0, 5.0));
    a.execute(Command::Delete { id }).unwrap();

    let summary = a.poll_remote();
    assert_eq!(summary.applied, 0);
    assert_eq!(a.engine().stats().echoes, 2);
    assert!(a.collection().is_empty());
}

#[test]
fn edits_converge_between_clients() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut b = board(&hub, "b");

    let rect = drag(&mut a, Tool::Rectangle, (0.0, 0.0), (10.0, 10.0));
    b.poll_remote();
    drag(&mut b, Tool::Circle, (20.0, 20.0), (23.0, 24.0));
    b.execute(Command::Patch { id: rect.clone(), patch: ElementPatch::size(15.0, 5.0) }).unwrap();
    a.poll_remote();
    a.execute(Command::Translate { id: rect, dx: 1.0, dy: 1.0 }).unwrap();
    b.poll_remote();

    assert_eq!(a.collection(), b.collection());
    assert_eq!(a.collection().len(), 2);
}

#[test]
fn undo_propagates_as_full_sync() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut b = board(&hub, "b");

    drag(&mut a, Tool::Rectangle, (0.0, 0.0), (1.0, 1.0));
    drag(&mut a, Tool::Circle, (0.0, 0.0), (1.0, 1.0));
    a.execute(Command::Undo).unwrap();
    b.poll_remote();

    assert_eq!(b.collection(), a.collection());
    assert_eq!(b.collection().len(), 1);
}

#[test]
fn offline_edits_reach_peers_after_reconnect() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    let mut b = board(&hub, "b");

    a.engine_mut().channel_mut().disconnect();
    a.poll_remote();
    drag(&mut a, Tool::Ellipse, (0.0, 0.0), (6.0, 3.0));
    assert_eq!(a.engine().stats().skipped, 1);
    b.poll_remote();
    assert!(b.collection().is_empty());

    a.engine_mut().channel_mut().reconnect();
    assert!(a.poll_remote().opened);
    b.poll_remote();
    assert_eq!(b.collection(), a.collection());
}

#[test]
fn send_full_repairs_a_diverged_peer() {
    let hub = MemoryHub::new();
    let mut a = board(&hub, "a");
    drag(&mut a, Tool::Rectangle, (0.0, 0.0), (2.0, 2.0));

    let mut b = board(&hub, "b");
    assert!(b.collection().is_empty());
    assert_eq!(a.execute(Command::SendFull).unwrap(), Outcome::Unchanged);
    b.poll_remote();
    assert_eq!(b.collection(), a.collection());
    assert_eq!(a.history().undo_count(), 1);
}

fn any_delta() -> impl Strategy<Value = Delta> {
    let element = (0u8..4, 1.0f64..50.0).prop_map(|(n, r)| circle(&format!("e{n}"), r));
    prop_oneof![
        element.clone().prop_map(|element| Delta::Add { element }),
        element.clone().prop_map(|element| Delta::Update { element }),
        (0u8..4).prop_map(|n| Delta::Delete { id: format!("e{n}").into() }),
        proptest::collection::vec(element, 0..4).prop_map(|elements| Delta::Full { elements }),
    ]
}

proptest! {
    #[test]
    fn deltas_tagged_with_own_id_never_apply(deltas in proptest::collection::vec(any_delta(), 1..12)) {
        let hub = MemoryHub::new();
        let mut a = board(&hub, "a");
        let mut peer = hub.connect();
        a.execute(Command::Load {
            json: r#"[{"id":"e0","type":"circle","x":0,"y":0,"radius":2}]"#.into(),
        }).unwrap();
        let before = a.collection().clone();

        for delta in deltas {
            inject(&mut peer, "a", delta);
        }
        let summary = a.poll_remote();
        prop_assert_eq!(summary.applied, 0);
        prop_assert_eq!(a.collection(), &before);
    }
}
