//! Room registry and client-merge tests
//!
//! These exercise the in-process broadcast layer and the consumer-side merge
//! contract directly; no database or HTTP stack is involved.

use time::OffsetDateTime;
use uuid::Uuid;

use reel::domain::engagement::{Comment, CommentNode};
use reel::realtime::client::{CommentCache, MergeOutcome, ReconnectBackoff, RECONNECT_SCHEDULE};
use reel::realtime::events::RoomEvent;
use reel::realtime::CommentRooms;

fn comment_at(video_id: Uuid, parent_id: Option<Uuid>, offset_secs: i64) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        video_id,
        author_id: Uuid::new_v4(),
        parent_id,
        body: format!("comment at +{}s", offset_secs),
        created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + offset_secs).unwrap(),
    }
}

fn added(comment: &Comment) -> RoomEvent {
    RoomEvent::CommentAdded {
        comment: comment.clone(),
    }
}

// ===========================================================================
// Room registry
// ===========================================================================

#[tokio::test]
async fn broadcast_reaches_every_member_of_the_room_and_nobody_else() {
    let rooms = CommentRooms::new();
    let video = Uuid::new_v4();
    let other_video = Uuid::new_v4();

    let (_a, mut rx_a) = rooms.join(video);
    let (_b, mut rx_b) = rooms.join(video);
    let (_c, mut rx_c) = rooms.join(video);
    let (_d, mut rx_d) = rooms.join(other_video);

    let event = added(&comment_at(video, None, 0));
    rooms.broadcast(video, &event);

    for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
        assert!(matches!(
            rx.try_recv().expect("member must receive"),
            RoomEvent::CommentAdded { .. }
        ));
    }
    assert!(rx_d.try_recv().is_err(), "other room must stay quiet");
}

#[tokio::test]
async fn leaving_empties_and_removes_the_room() {
    let rooms = CommentRooms::new();
    let video = Uuid::new_v4();

    let (member_a, _rx_a) = rooms.join(video);
    let (member_b, _rx_b) = rooms.join(video);
    assert_eq!(rooms.member_count(video), 2);

    rooms.leave(video, member_a);
    assert_eq!(rooms.member_count(video), 1);

    rooms.leave(video, member_b);
    assert_eq!(rooms.member_count(video), 0);

    // Rooms are ephemeral: a fresh join recreates one from nothing.
    let (_member_c, _rx_c) = rooms.join(video);
    assert_eq!(rooms.member_count(video), 1);
}

#[tokio::test]
async fn dead_members_are_pruned_on_broadcast() {
    let rooms = CommentRooms::new();
    let video = Uuid::new_v4();

    let (_member, rx) = rooms.join(video);
    drop(rx);
    assert_eq!(rooms.member_count(video), 1);

    rooms.broadcast(video, &added(&comment_at(video, None, 0)));
    assert_eq!(rooms.member_count(video), 0);
}

#[tokio::test]
async fn a_member_sees_events_in_broadcast_order() {
    let rooms = CommentRooms::new();
    let video = Uuid::new_v4();
    let (_member, mut rx) = rooms.join(video);

    let first = comment_at(video, None, 1);
    let second = comment_at(video, None, 2);
    let third = comment_at(video, None, 3);
    for comment in [&first, &second, &third] {
        rooms.broadcast(video, &added(comment));
    }

    for expected in [&first, &second, &third] {
        match rx.try_recv().expect("event expected") {
            RoomEvent::CommentAdded { comment } => assert_eq!(comment.id, expected.id),
            other => panic!("expected CommentAdded, got {:?}", other),
        }
    }
}

#[test]
fn events_serialize_with_a_type_tag() {
    let video = Uuid::new_v4();
    let comment = comment_at(video, None, 0);

    let incremental = serde_json::to_value(added(&comment)).unwrap();
    assert_eq!(incremental["type"], "comment_added");
    assert_eq!(incremental["comment"]["id"], comment.id.to_string());

    let snapshot = serde_json::to_value(RoomEvent::Snapshot {
        comments: vec![CommentNode {
            comment: comment.clone(),
            replies: vec![],
        }],
    })
    .unwrap();
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["comments"][0]["id"], comment.id.to_string());
    assert!(snapshot["comments"][0]["replies"].is_array());
}

// ===========================================================================
// Tree assembly
// ===========================================================================

#[test]
fn assemble_orders_top_level_newest_first_and_replies_oldest_first() {
    let video = Uuid::new_v4();
    let old_top = comment_at(video, None, 0);
    let new_top = comment_at(video, None, 10);
    let early_reply = comment_at(video, Some(old_top.id), 1);
    let late_reply = comment_at(video, Some(old_top.id), 5);

    // Input arrives ascending by creation, as the query emits it.
    let tree = CommentNode::assemble(vec![
        old_top.clone(),
        early_reply.clone(),
        late_reply.clone(),
        new_top.clone(),
    ]);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].comment.id, new_top.id);
    assert_eq!(tree[1].comment.id, old_top.id);
    assert_eq!(tree[1].replies[0].id, early_reply.id);
    assert_eq!(tree[1].replies[1].id, late_reply.id);
}

#[test]
fn assemble_drops_replies_whose_parent_is_missing() {
    let video = Uuid::new_v4();
    let survivor = comment_at(video, None, 0);
    let orphan = comment_at(video, Some(Uuid::new_v4()), 1);

    let tree = CommentNode::assemble(vec![survivor.clone(), orphan]);

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].comment.id, survivor.id);
    assert!(tree[0].replies.is_empty());
}

// ===========================================================================
// Client-side merge
// ===========================================================================

#[test]
fn snapshot_replaces_the_held_tree() {
    let video = Uuid::new_v4();
    let mut cache = CommentCache::new();

    let stale = comment_at(video, None, 0);
    assert_eq!(cache.apply(added(&stale)), MergeOutcome::Applied);

    let fresh = comment_at(video, None, 5);
    let outcome = cache.apply(RoomEvent::Snapshot {
        comments: vec![CommentNode {
            comment: fresh.clone(),
            replies: vec![],
        }],
    });
    assert_eq!(outcome, MergeOutcome::Applied);
    assert_eq!(cache.total(), 1);
    assert!(cache.contains(fresh.id));
    assert!(!cache.contains(stale.id));
}

#[test]
fn duplicate_incrementals_merge_idempotently() {
    let video = Uuid::new_v4();
    let mut cache = CommentCache::new();
    let comment = comment_at(video, None, 0);

    assert_eq!(cache.apply(added(&comment)), MergeOutcome::Applied);
    assert_eq!(cache.apply(added(&comment)), MergeOutcome::Duplicate);
    assert_eq!(cache.total(), 1);
}

#[test]
fn snapshot_after_incremental_does_not_duplicate() {
    let video = Uuid::new_v4();
    let mut cache = CommentCache::new();
    let comment = comment_at(video, None, 0);

    cache.apply(added(&comment));
    cache.apply(RoomEvent::Snapshot {
        comments: vec![CommentNode {
            comment: comment.clone(),
            replies: vec![],
        }],
    });

    assert_eq!(cache.total(), 1);
}

#[test]
fn unplaceable_incremental_demands_a_resync() {
    let video = Uuid::new_v4();
    let mut cache = CommentCache::new();

    let reply = comment_at(video, Some(Uuid::new_v4()), 0);
    assert_eq!(cache.apply(added(&reply)), MergeOutcome::NeedsResync);
    assert_eq!(cache.total(), 0);
}

#[test]
fn merge_order_is_position_not_arrival() {
    let video = Uuid::new_v4();
    let mut cache = CommentCache::new();

    let top = comment_at(video, None, 0);
    let early_reply = comment_at(video, Some(top.id), 1);
    let late_reply = comment_at(video, Some(top.id), 8);
    let newer_top = comment_at(video, None, 10);

    // Deliberately interleaved arrival.
    for event in [&newer_top, &top] {
        cache.apply(added(event));
    }
    for event in [&late_reply, &early_reply] {
        cache.apply(added(event));
    }

    let tree = cache.comments();
    assert_eq!(tree[0].comment.id, newer_top.id);
    assert_eq!(tree[1].comment.id, top.id);
    assert_eq!(tree[1].replies[0].id, early_reply.id);
    assert_eq!(tree[1].replies[1].id, late_reply.id);
}

// ===========================================================================
// Reconnect backoff
// ===========================================================================

#[test]
fn backoff_grows_then_holds_at_the_cap() {
    let mut backoff = ReconnectBackoff::new();

    let mut observed = Vec::new();
    for _ in 0..6 {
        observed.push(backoff.next_delay());
    }

    assert_eq!(&observed[..4], &RECONNECT_SCHEDULE[..]);
    assert_eq!(observed[4], RECONNECT_SCHEDULE[3]);
    assert_eq!(observed[5], RECONNECT_SCHEDULE[3]);

    backoff.reset();
    assert_eq!(backoff.next_delay(), RECONNECT_SCHEDULE[0]);
}
