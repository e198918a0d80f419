use chrono::Duration;
use domains::{Comment, ErrorKind, ItemId, Session, VoteType};
use integration_tests::TestForum;
use services::CommentVoteAction;

struct Thread {
    t: TestForum,
    pg: Session,
    dang: Session,
    post: ItemId,
}

impl Thread {
    async fn new() -> Self {
        let t = TestForum::new();
        let pg = t.user("pg").await;
        let dang = t.user("dang").await;
        let post = t.post(&pg, "Lisp in Web-Based Applications").await.id;
        Self { t, pg, dang, post }
    }

    async fn reply(&self, author: &Session, content: &str, parent: ItemId) -> Comment {
        self.t.advance(Duration::seconds(1));
        self.t
            .forum
            .create_comment(author, content, parent)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn replies_inherit_the_root_and_go_one_level_deeper() {
    let th = Thread::new().await;
    let top = th.reply(&th.dang, "top", th.post).await;
    let child = th.reply(&th.pg, "child", top.id).await;
    let grandchild = th.reply(&th.dang, "grandchild", child.id).await;

    assert_eq!((top.root, top.depth, top.parent), (th.post, 0, th.post));
    assert_eq!((child.root, child.depth, child.parent), (th.post, 1, top.id));
    assert_eq!(
        (grandchild.root, grandchild.depth, grandchild.parent),
        (th.post, 2, child.id)
    );
}

#[tokio::test]
async fn new_comments_carry_the_authors_upvote_without_karma() {
    let th = Thread::new().await;
    let comment = th.reply(&th.dang, "first", th.post).await;

    let details = th
        .t
        .forum
        .comment_details(&th.dang, comment.id)
        .await
        .unwrap();
    assert_eq!(details.vote, Some(VoteType::Up));
    assert_eq!(th.t.karma(&th.dang).await, 1);

    let anonymous = th
        .t
        .forum
        .comment_details(&Session::anonymous(), comment.id)
        .await
        .unwrap();
    assert_eq!(anonymous.vote, None);
    assert_eq!(anonymous.comment.content, "first");
}

#[tokio::test]
async fn replies_need_a_live_parent_and_content() {
    let th = Thread::new().await;

    let err = th
        .t
        .forum
        .create_comment(&th.dang, "orphan", ItemId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = th
        .t
        .forum
        .create_comment(&th.dang, "   ", th.post)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadValues);

    let err = th
        .t
        .forum
        .create_comment(&Session::anonymous(), "hi", th.post)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn threads_flatten_in_pre_order() {
    let th = Thread::new().await;
    let a = th.reply(&th.dang, "a", th.post).await;
    let b = th.reply(&th.pg, "b", th.post).await;
    let a1 = th.reply(&th.pg, "a1", a.id).await;
    th.reply(&th.dang, "b1", b.id).await;
    th.reply(&th.dang, "a1x", a1.id).await;
    th.reply(&th.pg, "a2", a.id).await;

    let thread = th.t.forum.comment_thread(th.post).await.unwrap();
    assert_eq!(thread.len(), 6);

    let flat: Vec<(u32, String)> = thread
        .flatten()
        .into_iter()
        .map(|f| (f.depth, f.comment.content))
        .collect();
    assert_eq!(
        flat,
        [
            (0, "a".to_string()),
            (1, "a1".to_string()),
            (2, "a1x".to_string()),
            (1, "a2".to_string()),
            (0, "b".to_string()),
            (1, "b1".to_string()),
        ]
    );

    let nested = thread.nested();
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[0].comment.id, a.id);
    assert_eq!(nested[0].children.len(), 2);
    assert_eq!(nested[0].children[0].children[0].comment.content, "a1x");
    assert_eq!(nested[1].children[0].comment.content, "b1");
}

#[tokio::test]
async fn threads_of_missing_posts_are_not_found() {
    let th = Thread::new().await;
    let err = th
        .t
        .forum
        .comment_thread(ItemId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn comments_are_deleted_leaf_first() {
    let th = Thread::new().await;
    let top = th.reply(&th.dang, "top", th.post).await;
    let reply = th.reply(&th.pg, "reply", top.id).await;

    let err = th
        .t
        .forum
        .delete_comment(&th.dang, top.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    th.t.forum.delete_comment(&th.pg, reply.id).await.unwrap();
    th.t.forum.delete_comment(&th.dang, top.id).await.unwrap();

    let thread = th.t.forum.comment_thread(th.post).await.unwrap();
    assert!(thread.is_empty());

    let err = th
        .t
        .forum
        .delete_comment(&th.dang, top.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn only_authors_edit_or_delete_their_comments() {
    let th = Thread::new().await;
    let comment = th.reply(&th.dang, "typo", th.post).await;

    let err = th
        .t
        .forum
        .edit_comment(&th.pg, comment.id, "rewritten")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    let err = th
        .t
        .forum
        .delete_comment(&th.pg, comment.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    th.t.advance(Duration::minutes(5));
    let edited = th
        .t
        .forum
        .edit_comment(&th.dang, comment.id, "fixed")
        .await
        .unwrap();
    assert_eq!(edited.content, "fixed");
    assert_eq!(edited.created_at, comment.created_at);
    assert!(edited.updated_at > comment.updated_at);
}

#[tokio::test]
async fn comment_details_reflect_the_viewers_latest_vote() {
    let th = Thread::new().await;
    let comment = th.reply(&th.dang, "vote on me", th.post).await;
    th.t.grant_karma(&th.pg, 5).await;

    th.t.forum
        .vote_comment(&th.pg, comment.id, CommentVoteAction::Downvote)
        .await
        .unwrap();
    let details = th
        .t
        .forum
        .comment_details(&th.pg, comment.id)
        .await
        .unwrap();
    assert_eq!(details.vote, Some(VoteType::Down));

    th.t.forum
        .vote_comment(&th.pg, comment.id, CommentVoteAction::Unvote)
        .await
        .unwrap();
    let details = th
        .t
        .forum
        .comment_details(&th.pg, comment.id)
        .await
        .unwrap();
    assert_eq!(details.vote, None);
}
