//! End-to-end tests against the marketplace facade: submission through
//! moderation, points, and the swap workflow, including the concurrency
//! properties the transactional appends are there for.

use std::sync::Arc;

use anyhow::Result;

use rewear_core::{DomainError, ListingId, UserId};
use rewear_listings::{Category, Condition, ListingDetails, ListingStatus, ReportSource};
use rewear_marketplace::{Marketplace, ModerationAction};
use rewear_swaps::{SwapKind, SwapStatus};

/// Fresh marketplace with tracing wired up so test failures carry the
/// structured log of the commands that led there.
fn market() -> Marketplace {
    rewear_observability::init();
    Marketplace::new()
}

fn coat_details() -> ListingDetails {
    ListingDetails {
        title: "Wool coat".to_string(),
        description: "Warm winter coat, barely worn".to_string(),
        category: Category::Outerwear,
        item_type: "coat".to_string(),
        size: "M".to_string(),
        condition: Condition::LikeNew,
    }
}

fn scarf_details() -> ListingDetails {
    ListingDetails {
        title: "Silk scarf".to_string(),
        description: "Patterned scarf in good shape".to_string(),
        category: Category::Accessories,
        item_type: "scarf".to_string(),
        size: "one-size".to_string(),
        condition: Condition::Good,
    }
}

fn submit(market: &Marketplace, owner: UserId, details: ListingDetails) -> Result<ListingId> {
    let receipt = market.submit_item(
        owner,
        details,
        vec!["https://img.example/1.jpg".to_string()],
        vec!["winter".to_string()],
        false,
    )?;
    Ok(receipt.listing_id)
}

/// Submit and approve, leaving the listing Available.
fn listed_available(market: &Marketplace, owner: UserId, admin: UserId) -> Result<ListingId> {
    let listing_id = submit(market, owner, coat_details())?;
    market.moderate(listing_id, admin, ModerationAction::Approve)?;
    Ok(listing_id)
}

#[test]
fn approve_credits_points_value_exactly_once() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;

    let listing_id = submit(&market, owner, coat_details())?;
    assert_eq!(market.user_balance(owner)?, 0);

    let view = market.moderate(listing_id, admin, ModerationAction::Approve)?;
    assert_eq!(view.status, ListingStatus::Available);
    assert!(view.approved);
    // outerwear (1.5) x like-new (1.5) on a base of 20
    assert_eq!(view.points_value, 45);
    assert_eq!(market.user_balance(owner)?, 45);

    // Second approve is an invalid transition and must not credit again.
    let err = market
        .moderate(listing_id, admin, ModerationAction::Approve)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));
    assert_eq!(market.user_balance(owner)?, 45);

    let actions = market.recent_actions(10, 0)?;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].listing_id, listing_id);

    let stats = market.stats()?;
    assert_eq!(stats.approved_today, 1);
    assert_eq!(stats.pending, 0);
    Ok(())
}

#[test]
fn reject_leaves_balance_untouched() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;

    let listing_id = submit(&market, owner, coat_details())?;
    let view = market.moderate(listing_id, admin, ModerationAction::Reject)?;

    assert_eq!(view.status, ListingStatus::Rejected);
    assert!(!view.approved);
    assert_eq!(market.user_balance(owner)?, 0);
    assert_eq!(market.stats()?.rejected_today, 1);
    Ok(())
}

#[test]
fn submission_without_images_must_be_a_draft() -> Result<()> {
    let market = market();
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;

    let err = market
        .submit_item(owner, coat_details(), vec![], vec![], false)
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(market.stats()?.pending, 0);

    let receipt = market.submit_item(owner, coat_details(), vec![], vec![], true)?;
    assert_eq!(receipt.status, ListingStatus::Draft);
    Ok(())
}

#[test]
fn draft_goes_through_review_before_moderation() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let other = market.register_member("Femi", "femi@example.com", None)?.id;

    let receipt = market.submit_item(
        owner,
        coat_details(),
        vec!["https://img.example/1.jpg".to_string()],
        vec![],
        true,
    )?;
    let listing_id = receipt.listing_id;

    // Drafts are not in the moderation queue yet.
    let err = market
        .moderate(listing_id, admin, ModerationAction::Approve)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));

    let err = market.submit_for_review(listing_id, other).unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);

    market.submit_for_review(listing_id, owner)?;
    assert_eq!(market.listing(listing_id)?.status, ListingStatus::Pending);
    assert_eq!(market.stats()?.pending, 1);
    Ok(())
}

#[test]
fn members_cannot_moderate() -> Result<()> {
    let market = market();
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let listing_id = submit(&market, owner, coat_details())?;

    // Fail-closed: denied before the listing is even read.
    let err = market
        .moderate(listing_id, owner, ModerationAction::Approve)
        .unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);

    let err = market
        .moderate(ListingId::new(9999), owner, ModerationAction::Approve)
        .unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);
    Ok(())
}

#[test]
fn flag_clear_round_trip_keeps_derived_approval() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let reporter = market.register_member("Femi", "femi@example.com", None)?.id;

    let listing_id = listed_available(&market, owner, admin)?;

    market.file_report(listing_id, "looks counterfeit", ReportSource::User(reporter))?;
    assert_eq!(market.listing(listing_id)?.status, ListingStatus::Flagged);
    assert_eq!(market.stats()?.flagged, 1);

    // A flagged listing cannot be rejected; it is not in the pending queue.
    let err = market
        .moderate(listing_id, admin, ModerationAction::Reject)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));

    let view = market.moderate(listing_id, admin, ModerationAction::ClearFlag)?;
    assert_eq!(view.status, ListingStatus::Available);
    assert!(view.approved);

    // Exactly two admin actions (approve, clear); the report is not one.
    let actions = market.recent_actions(10, 0)?;
    assert_eq!(actions.len(), 2);
    Ok(())
}

#[test]
fn remove_works_from_available_and_flagged() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;

    let first = listed_available(&market, owner, admin)?;
    let view = market.moderate(first, admin, ModerationAction::Remove)?;
    assert_eq!(view.status, ListingStatus::Removed);

    let second = listed_available(&market, owner, admin)?;
    market.file_report(second, "spam", ReportSource::AutoDetection)?;
    let view = market.moderate(second, admin, ModerationAction::Remove)?;
    assert_eq!(view.status, ListingStatus::Removed);

    // Removed listings stay addressable; removal is a status, not a delete.
    assert_eq!(market.listing(first)?.status, ListingStatus::Removed);
    Ok(())
}

#[test]
fn concurrent_approves_credit_exactly_once() -> Result<()> {
    let market = Arc::new(market());
    let admin_a = market.register_admin("Mira", "mira@example.com", None)?.id;
    let admin_b = market.register_admin("Noor", "noor@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;

    let listing_id = submit(&market, owner, coat_details())?;

    let handles: Vec<_> = [admin_a, admin_b]
        .into_iter()
        .map(|admin| {
            let market = Arc::clone(&market);
            std::thread::spawn(move || market.moderate(listing_id, admin, ModerationAction::Approve))
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.join().expect("thread panicked"));
    }

    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1, "exactly one approve must win: {outcomes:?}");
    let losing = outcomes
        .into_iter()
        .find_map(|o| o.err())
        .expect("one approve must lose");
    assert!(
        matches!(losing, DomainError::InvalidTransition(_) | DomainError::Conflict(_)),
        "unexpected losing error: {losing:?}"
    );

    assert_eq!(market.user_balance(owner)?, 45);
    let approvals = market
        .recent_actions(10, 0)?
        .into_iter()
        .filter(|a| a.listing_id == listing_id)
        .count();
    assert_eq!(approvals, 1);
    Ok(())
}

#[test]
fn listing_allows_one_active_swap() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let first = market.register_member("Femi", "femi@example.com", None)?.id;
    let second = market.register_member("Kai", "kai@example.com", None)?.id;

    let listing_id = listed_available(&market, owner, admin)?;

    let err = market
        .open_swap(owner, listing_id, SwapKind::DirectSwap)
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let swap = market.open_swap(first, listing_id, SwapKind::DirectSwap)?;
    assert_eq!(swap.status, SwapStatus::Pending);

    let err = market
        .open_swap(second, listing_id, SwapKind::DirectSwap)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));

    // Rejection releases the reservation.
    market.reject_swap(swap.id, owner)?;
    let swap = market.open_swap(second, listing_id, SwapKind::DirectSwap)?;
    assert_eq!(swap.requester, second);
    Ok(())
}

#[test]
fn point_redemption_settles_atomically() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let requester = market.register_member("Femi", "femi@example.com", None)?.id;

    let listing_id = listed_available(&market, owner, admin)?;

    // No points yet: redemption is refused up front.
    let err = market
        .open_swap(requester, listing_id, SwapKind::PointRedemption)
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientBalance { .. }));

    // Earn 45 points by getting an item approved.
    let earner = submit(&market, requester, coat_details())?;
    market.moderate(earner, admin, ModerationAction::Approve)?;
    assert_eq!(market.user_balance(requester)?, 45);

    let swap = market.open_swap(requester, listing_id, SwapKind::PointRedemption)?;
    market.approve_swap(swap.id, owner)?;
    market.mark_in_transit(swap.id, owner)?;
    let done = market.complete_swap(swap.id, requester)?;

    assert_eq!(done.status, SwapStatus::Completed);
    assert!(done.completed_at.is_some());
    assert_eq!(market.listing(listing_id)?.status, ListingStatus::Swapped);
    // 45 moved from requester to owner; owner also keeps the approval credit.
    assert_eq!(market.user_balance(requester)?, 0);
    assert_eq!(market.user_balance(owner)?, 90);
    Ok(())
}

#[test]
fn direct_swap_moves_no_points() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let requester = market.register_member("Femi", "femi@example.com", None)?.id;

    let listing_id = listed_available(&market, owner, admin)?;

    let swap = market.open_swap(requester, listing_id, SwapKind::DirectSwap)?;
    market.approve_swap(swap.id, owner)?;
    market.mark_in_transit(swap.id, owner)?;
    market.complete_swap(swap.id, owner)?;

    assert_eq!(market.listing(listing_id)?.status, ListingStatus::Swapped);
    assert_eq!(market.user_balance(requester)?, 0);
    assert_eq!(market.user_balance(owner)?, 45); // approval credit only
    Ok(())
}

#[test]
fn swap_role_checks_hold() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let requester = market.register_member("Femi", "femi@example.com", None)?.id;
    let stranger = market.register_member("Kai", "kai@example.com", None)?.id;

    let listing_id = listed_available(&market, owner, admin)?;
    let swap = market.open_swap(requester, listing_id, SwapKind::DirectSwap)?;

    let err = market.approve_swap(swap.id, requester).unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);
    let err = market.reject_swap(swap.id, stranger).unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);

    market.approve_swap(swap.id, owner)?;
    let err = market.reject_swap(swap.id, requester).unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));
    Ok(())
}

#[test]
fn browse_shows_available_newest_first() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;

    let first = listed_available(&market, owner, admin)?;
    let second = listed_available(&market, owner, admin)?;
    let pending = submit(&market, owner, scarf_details())?;

    let feed = market.browse_available()?;
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].id, second);
    assert_eq!(feed[1].id, first);
    assert!(feed.iter().all(|l| l.id != pending));

    let pending_page = market.list_by_status(ListingStatus::Pending, 10, 0)?;
    assert_eq!(pending_page.len(), 1);
    assert_eq!(pending_page[0].id, pending);
    Ok(())
}

#[test]
fn registration_keeps_location_through_to_the_dashboard() -> Result<()> {
    let market = market();
    let located = market.register_member(
        "Asha",
        "asha@example.com",
        Some("Lisbon".to_string()),
    )?;
    let unlocated = market.register_member("Femi", "femi@example.com", None)?;

    assert_eq!(located.location.as_deref(), Some("Lisbon"));
    assert_eq!(market.user(located.id)?.location.as_deref(), Some("Lisbon"));
    assert_eq!(unlocated.location, None);

    let dashboard = market.dashboard(located.id)?;
    assert_eq!(dashboard.user.location.as_deref(), Some("Lisbon"));
    Ok(())
}

#[test]
fn dashboard_reports_impact() -> Result<()> {
    let market = market();
    let admin = market.register_admin("Mira", "mira@example.com", None)?.id;
    let owner = market.register_member("Asha", "asha@example.com", None)?.id;
    let requester = market.register_member("Femi", "femi@example.com", None)?.id;

    let listing_id = listed_available(&market, owner, admin)?;
    let draft = market.submit_item(owner, scarf_details(), vec![], vec![], true)?;

    let swap = market.open_swap(requester, listing_id, SwapKind::DirectSwap)?;
    market.approve_swap(swap.id, owner)?;
    market.mark_in_transit(swap.id, owner)?;
    market.complete_swap(swap.id, requester)?;

    let dashboard = market.dashboard(owner)?;
    assert_eq!(dashboard.user.id, owner);
    assert_eq!(dashboard.stats.items_listed, 2);
    assert_eq!(dashboard.stats.completed_swaps, 1);
    assert_eq!(dashboard.stats.ongoing_swaps, 0);
    assert_eq!(dashboard.stats.points_balance, 45);
    // 1 completed swap * 5 + 2 items * 2
    assert_eq!(dashboard.stats.impact_score, 9);
    assert!(dashboard.items.iter().any(|l| l.id == draft.listing_id));

    let requester_dash = market.dashboard(requester)?;
    assert_eq!(requester_dash.stats.completed_swaps, 1);
    assert_eq!(requester_dash.stats.items_listed, 0);
    Ok(())
}
