// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_stack_yields_default_context() {
    let stack = ContextStack::new();
    assert_eq!(stack.current(), ActorContext::default());
    assert_eq!(stack.depth(), 0);
}

#[test]
fn push_set_restore() {
    let mut stack = ContextStack::new();
    let outer = ActorContext::for_player(ObjectId(1));
    let inner = ActorContext::for_object(ObjectId(2));

    stack.push(outer);
    stack.push(inner);
    assert_eq!(stack.current(), inner);

    assert_eq!(stack.pop(), Some(inner));
    assert_eq!(stack.current(), outer, "outer context restored");

    assert_eq!(stack.pop(), Some(outer));
    assert_eq!(stack.current(), ActorContext::default());
    assert_eq!(stack.pop(), None);
}

#[test]
fn for_player_sets_both_fields() {
    let ctx = ActorContext::for_player(ObjectId(7));
    assert_eq!(ctx.this_player, Some(ObjectId(7)));
    assert_eq!(ctx.this_object, Some(ObjectId(7)));

    let obj = ActorContext::for_object(ObjectId(9));
    assert_eq!(obj.this_player, None);
    assert_eq!(obj.this_object, Some(ObjectId(9)));
}

#[test]
fn clear_empties_the_stack() {
    let mut stack = ContextStack::new();
    stack.push(ActorContext::for_player(ObjectId(1)));
    stack.push(ActorContext::for_player(ObjectId(2)));
    stack.clear();
    assert_eq!(stack.depth(), 0);
    assert_eq!(stack.current(), ActorContext::default());
}
