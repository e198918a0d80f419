use chrono::Duration;
use domains::{ErrorKind, ItemId, PostDraft, Session, VoteType};
use integration_tests::TestForum;
use services::{CommentVoteAction, MarkOutcome, PostVoteAction};

// ── Users and karma ─────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_grants_signup_karma() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    assert_eq!(t.karma(&pg).await, 1);

    let me = t.forum.session_user(&pg).await.unwrap();
    assert_eq!(me.profile.username, "pg");
    assert_eq!(me.karma, 1);
}

#[tokio::test]
async fn usernames_are_unique_and_signup_needs_a_logged_out_session() {
    let t = TestForum::new();
    let pg = t.user("pg").await;

    let err = t
        .forum
        .register(&Session::anonymous(), "pg")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    let err = t.forum.register(&pg, "pg2").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
}

#[tokio::test]
async fn private_profile_fields_are_only_shown_to_the_owner() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    t.forum
        .update_profile(&pg, Some("pg@example.com".into()), Some("essays".into()))
        .await
        .unwrap();

    let own = t.forum.user_profile(&pg, "pg").await.unwrap();
    assert_eq!(own.profile.email.as_deref(), Some("pg@example.com"));
    assert!(own.profile.top_bar_color.is_some());

    let seen = t.forum.user_profile(&dang, "pg").await.unwrap();
    assert_eq!(seen.profile.email, None);
    assert_eq!(seen.profile.top_bar_color, None);
    assert_eq!(seen.profile.bio.as_deref(), Some("essays"));

    let err = t
        .forum
        .user_profile(&dang, "nobody")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn top_bar_color_needs_two_karma() {
    let t = TestForum::new();
    let pg = t.user("pg").await;

    let err = t
        .forum
        .change_top_bar_color(&pg, "#000000")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    t.grant_karma(&pg, 1).await;
    let profile = t.forum.change_top_bar_color(&pg, "#000000").await.unwrap();
    assert_eq!(profile.top_bar_color.as_deref(), Some("#000000"));
}

// ── Posts and post votes ────────────────────────────────────────────────────

#[tokio::test]
async fn new_posts_carry_the_authors_upvote_without_karma() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let post = t.post(&pg, "Hackers and Painters").await;

    let details = t.forum.get_post_details(&pg, post.id).await.unwrap();
    assert_eq!(details.points, 1);
    assert_eq!(details.vote, Some(VoteType::Up));
    assert_eq!(t.karma(&pg).await, 1);
}

#[tokio::test]
async fn post_titles_are_required() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let err = t
        .forum
        .create_post(&pg, PostDraft::titled("  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadValues);
}

#[tokio::test]
async fn upvote_credits_and_unvote_debits_the_author() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    let post = t.post(&pg, "Beating the Averages").await;

    t.forum
        .vote_post(&dang, post.id, PostVoteAction::Up)
        .await
        .unwrap();
    assert_eq!(t.karma(&pg).await, 2);

    let err = t
        .forum
        .vote_post(&dang, post.id, PostVoteAction::Up)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    let details = t.forum.get_post_details(&dang, post.id).await.unwrap();
    assert_eq!(details.points, 2);
    assert_eq!(t.karma(&pg).await, 2);

    t.forum
        .vote_post(&dang, post.id, PostVoteAction::Unvote)
        .await
        .unwrap();
    assert_eq!(t.karma(&pg).await, 1);

    let err = t
        .forum
        .vote_post(&dang, post.id, PostVoteAction::Unvote)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn nobody_votes_on_their_own_post() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    t.grant_karma(&pg, 100).await;
    let post = t.post(&pg, "Do Things That Don't Scale").await;

    for action in [PostVoteAction::Up, PostVoteAction::Unvote] {
        let err = t.forum.vote_post(&pg, post.id, action).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAllowed);
    }
}

#[tokio::test]
async fn voting_on_a_missing_post_is_not_found() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let err = t
        .forum
        .vote_post(&pg, ItemId::new(), PostVoteAction::Up)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn edits_keep_the_creation_time_and_respect_the_window() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    let post = t.post(&pg, "Orignal title").await;

    t.advance(Duration::minutes(90));
    let edited = t
        .forum
        .edit_post(&pg, post.id, PostDraft::titled("Original title"))
        .await
        .unwrap();
    assert_eq!(edited.created_at, post.created_at);
    assert_eq!(edited.title, "Original title");

    let err = t
        .forum
        .edit_post(&dang, post.id, PostDraft::titled("hijacked"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    t.advance(Duration::minutes(31));
    let err = t
        .forum
        .edit_post(&pg, post.id, PostDraft::titled("too late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
}

#[tokio::test]
async fn posts_with_comments_cannot_be_deleted() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    let post = t.post(&pg, "Why Arc isn't especially object-oriented").await;
    let comment = t
        .forum
        .create_comment(&dang, "Interesting.", post.id)
        .await
        .unwrap();

    let err = t.forum.delete_post(&pg, post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    t.forum.delete_comment(&dang, comment.id).await.unwrap();
    let err = t.forum.delete_post(&dang, post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    t.forum.delete_post(&pg, post.id).await.unwrap();
    let err = t
        .forum
        .get_post_details(&pg, post.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Marks ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn flagging_needs_five_karma() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    let post = t.post(&pg, "Spam, probably").await;

    t.grant_karma(&dang, 3).await;
    let err = t.forum.flag_post(&dang, post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert!(!t.forum.get_post_details(&dang, post.id).await.unwrap().flagged);

    t.grant_karma(&dang, 1).await;
    assert_eq!(
        t.forum.flag_post(&dang, post.id).await.unwrap(),
        MarkOutcome::Marked
    );
    assert_eq!(
        t.forum.flag_post(&dang, post.id).await.unwrap(),
        MarkOutcome::AlreadyMarked
    );
    assert!(t.forum.get_post_details(&dang, post.id).await.unwrap().flagged);

    t.forum.unflag_post(&dang, post.id).await.unwrap();
    let err = t.forum.unflag_post(&dang, post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn mark_then_unmark_leaves_nothing_behind() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let post = t.post(&pg, "Startup = Growth").await;

    t.forum.favorite_post(&pg, post.id).await.unwrap();
    t.forum.hide_post(&pg, post.id).await.unwrap();
    let details = t.forum.get_post_details(&pg, post.id).await.unwrap();
    assert!(details.favorited && details.hidden);

    t.forum.unfavorite_post(&pg, post.id).await.unwrap();
    t.forum.unhide_post(&pg, post.id).await.unwrap();
    let details = t.forum.get_post_details(&pg, post.id).await.unwrap();
    assert!(!details.favorited && !details.hidden);

    let err = t.forum.unhide_post(&pg, post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn marks_need_an_existing_post() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let err = t.forum.favorite_post(&pg, ItemId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn anonymous_sessions_cannot_mutate() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let post = t.post(&pg, "Cities and Ambition").await;
    let anon = Session::anonymous();

    let err = t
        .forum
        .vote_post(&anon, post.id, PostVoteAction::Up)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = t.forum.hide_post(&anon, post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = t.forum.get_hidden_posts(&anon).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

// ── Comment votes ───────────────────────────────────────────────────────────

#[tokio::test]
async fn comment_votes_move_karma_and_unvote_does_not_reverse_it() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    let post = t.post(&pg, "The Roots of Lisp").await;
    let comment = t
        .forum
        .create_comment(&pg, "McCarthy, 1960.", post.id)
        .await
        .unwrap();
    assert_eq!(t.karma(&pg).await, 1);

    t.forum
        .vote_comment(&dang, comment.id, CommentVoteAction::Upvote)
        .await
        .unwrap();
    assert_eq!(t.karma(&pg).await, 2);

    t.forum
        .vote_comment(&dang, comment.id, CommentVoteAction::Unvote)
        .await
        .unwrap();
    assert_eq!(t.karma(&pg).await, 2);

    // Unvoting nothing is quiet on comments.
    t.forum
        .vote_comment(&dang, comment.id, CommentVoteAction::Unvote)
        .await
        .unwrap();
}

#[tokio::test]
async fn comment_downvotes_need_six_karma_and_cost_the_author() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let dang = t.user("dang").await;
    let post = t.post(&pg, "Succinctness is Power").await;
    let comment = t
        .forum
        .create_comment(&pg, "Code is ideas.", post.id)
        .await
        .unwrap();

    t.grant_karma(&dang, 4).await;
    let err = t
        .forum
        .vote_comment(&dang, comment.id, CommentVoteAction::Downvote)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    t.grant_karma(&dang, 1).await;
    t.forum
        .vote_comment(&dang, comment.id, CommentVoteAction::Downvote)
        .await
        .unwrap();
    assert_eq!(t.karma(&pg).await, 0);

    let details = t.forum.comment_details(&dang, comment.id).await.unwrap();
    assert_eq!(details.vote, Some(VoteType::Down));
    assert_eq!(details.author_profile.map(|p| p.username).as_deref(), Some("pg"));
}

#[tokio::test]
async fn downvotes_at_zero_karma_leave_the_author_at_zero() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    let post = t.post(&pg, "Lisp for Web-Based Applications").await;
    let comment = t.forum.create_comment(&pg, "Viaweb.", post.id).await.unwrap();

    for name in ["a", "b"] {
        let critic = t.user(name).await;
        t.grant_karma(&critic, 5).await;
        t.forum
            .vote_comment(&critic, comment.id, CommentVoteAction::Downvote)
            .await
            .unwrap();
    }
    assert_eq!(t.karma(&pg).await, 0);
}

#[tokio::test]
async fn self_votes_on_comments_fail_regardless_of_karma() {
    let t = TestForum::new();
    let pg = t.user("pg").await;
    t.grant_karma(&pg, 100).await;
    let post = t.post(&pg, "Maker's Schedule").await;
    let comment = t.forum.create_comment(&pg, "Manager's too.", post.id).await.unwrap();

    for action in [
        CommentVoteAction::Upvote,
        CommentVoteAction::Downvote,
        CommentVoteAction::Unvote,
    ] {
        let err = t
            .forum
            .vote_comment(&pg, comment.id, action)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAllowed);
    }
}
