//! Row-wise annotation of comments and tickets: update flags, closed
//! flags, open durations, comment order and per-author history counts.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use rayon::prelude::*;

use crate::records::{Comment, Ticket, TicketKind};

/// Year used by the exports as a placeholder for a missing creation date.
pub const SENTINEL_YEAR: i32 = 1970;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedComment {
    pub comment: Comment,
    pub was_updated: bool,
    /// Pull requests the author opened strictly before this comment.
    pub num_pr_created: usize,
    /// Issues the author opened strictly before this comment.
    pub num_issue_created: usize,
    /// 0-based position among the comments of the same ticket.
    pub comment_order: usize,
    /// Comments the author posted strictly before this one
    /// (filled by [`annotate_logs`]).
    pub num_comments_posted: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedTicket {
    pub ticket: Ticket,
    pub was_updated: bool,
    pub is_closed: bool,
    /// `None` when the creation date is the 1970 placeholder.
    pub open_duration: Option<TimeDelta>,
    /// Tickets the author opened strictly before this one
    /// (filled by [`annotate_logs`]).
    pub num_tickets_opened: Option<usize>,
}

impl AnnotatedTicket {
    pub fn open_days(&self) -> Option<i64> {
        self.open_duration.map(|d| d.num_days())
    }
}

/// Creation times per author, sorted, for "how many before t" queries.
#[derive(Debug, Default)]
struct History<'a>(HashMap<&'a str, Vec<DateTime<Utc>>>);

impl<'a> History<'a> {
    fn build<I: IntoIterator<Item = (&'a str, DateTime<Utc>)>>(events: I) -> Self {
        let mut by_author: HashMap<&'a str, Vec<DateTime<Utc>>> = HashMap::new();
        for (author, at) in events {
            // a missing author id never matches anyone
            if author.is_empty() {
                continue;
            }
            by_author.entry(author).or_default().push(at);
        }
        for times in by_author.values_mut() {
            times.sort_unstable();
        }
        History(by_author)
    }

    fn count_before(&self, author: &str, at: DateTime<Utc>) -> usize {
        self.0
            .get(author)
            .map(|times| times.partition_point(|t| *t < at))
            .unwrap_or(0)
    }
}

fn was_updated(created_at: DateTime<Utc>, updated_at: Option<DateTime<Utc>>) -> bool {
    updated_at.is_some_and(|u| u != created_at)
}

/// Time a ticket stayed open, up to `now` when it is still open.
pub fn open_duration(ticket: &Ticket, now: DateTime<Utc>) -> Option<TimeDelta> {
    if ticket.created_at.year() == SENTINEL_YEAR {
        return None;
    }
    let end = ticket.closed_at.unwrap_or(now);
    Some(end - ticket.created_at)
}

/// 0-based order of each comment within its ticket, by creation time.
fn comment_orders(comments: &[Comment]) -> Vec<usize> {
    let mut by_time: Vec<usize> = (0..comments.len()).collect();
    by_time.sort_by_key(|&i| comments[i].created_at);
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut orders = vec![0; comments.len()];
    for i in by_time {
        let counter = seen.entry(comments[i].ticket_id.as_str()).or_insert(0);
        orders[i] = *counter;
        *counter += 1;
    }
    orders
}

/// Annotate comments and tickets with update/closed flags, the number
/// of pull requests and issues each comment author had opened before
/// commenting, comment order and ticket open duration.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use community_stats::annotate::annotate_comments_tickets;
/// use community_stats::records::{Comment, Ticket, TicketKind};
///
/// let t = |d| Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap();
/// let ticket = Ticket {
///     ticket_id: "1".into(), kind: TicketKind::PullRequest,
///     author_id: "7".into(), author_name: "alice".into(),
///     created_at: t(1), updated_at: Some(t(1)), closed_at: Some(t(3)),
///     title: String::new(), body: String::new(),
/// };
/// let comment = Comment {
///     ticket_id: "1".into(), author_id: "7".into(), author_name: "alice".into(),
///     created_at: t(2), updated_at: Some(t(2)), body: "ping".into(),
/// };
/// let (comments, tickets) = annotate_comments_tickets(vec![comment], vec![ticket], t(10));
/// assert_eq!(comments[0].num_pr_created, 1);
/// assert!(tickets[0].is_closed);
/// assert_eq!(tickets[0].open_days(), Some(2));
/// ```
pub fn annotate_comments_tickets(
    comments: Vec<Comment>,
    tickets: Vec<Ticket>,
    now: DateTime<Utc>,
) -> (Vec<AnnotatedComment>, Vec<AnnotatedTicket>) {
    let orders = comment_orders(&comments);
    let annotated_comments = {
        let prs = History::build(
            tickets
                .iter()
                .filter(|t| t.kind == TicketKind::PullRequest)
                .map(|t| (t.author_id.as_str(), t.created_at)),
        );
        let issues = History::build(
            tickets
                .iter()
                .filter(|t| t.kind == TicketKind::Issue)
                .map(|t| (t.author_id.as_str(), t.created_at)),
        );
        comments
            .into_par_iter()
            .zip(orders.into_par_iter())
            .map(|(comment, comment_order)| AnnotatedComment {
                was_updated: was_updated(comment.created_at, comment.updated_at),
                num_pr_created: prs.count_before(&comment.author_id, comment.created_at),
                num_issue_created: issues.count_before(&comment.author_id, comment.created_at),
                comment_order,
                num_comments_posted: None,
                comment,
            })
            .collect()
    };

    let annotated_tickets = tickets
        .into_iter()
        .map(|ticket| AnnotatedTicket {
            was_updated: was_updated(ticket.created_at, ticket.updated_at),
            is_closed: ticket.closed_at.is_some(),
            open_duration: open_duration(&ticket, now),
            num_tickets_opened: None,
            ticket,
        })
        .collect();

    (annotated_comments, annotated_tickets)
}

/// [`annotate_comments_tickets`] plus per-author running counts: prior
/// comments of each comment author, prior tickets of each ticket author.
pub fn annotate_logs(
    comments: Vec<Comment>,
    tickets: Vec<Ticket>,
    now: DateTime<Utc>,
) -> (Vec<AnnotatedComment>, Vec<AnnotatedTicket>) {
    let (mut comments, mut tickets) = annotate_comments_tickets(comments, tickets, now);

    let posted: Vec<usize> = {
        let history = History::build(
            comments
                .iter()
                .map(|c| (c.comment.author_id.as_str(), c.comment.created_at)),
        );
        comments
            .par_iter()
            .map(|c| history.count_before(&c.comment.author_id, c.comment.created_at))
            .collect()
    };
    for (c, n) in comments.iter_mut().zip(posted) {
        c.num_comments_posted = Some(n);
    }

    let opened: Vec<usize> = {
        let history = History::build(
            tickets
                .iter()
                .map(|t| (t.ticket.author_id.as_str(), t.ticket.created_at)),
        );
        tickets
            .iter()
            .map(|t| history.count_before(&t.ticket.author_id, t.ticket.created_at))
            .collect()
    };
    for (t, n) in tickets.iter_mut().zip(opened) {
        t.num_tickets_opened = Some(n);
    }

    (comments, tickets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, d, 12, 0, 0).unwrap()
    }

    fn ticket(id: &str, kind: TicketKind, author: &str, created: DateTime<Utc>) -> Ticket {
        Ticket {
            ticket_id: id.into(),
            kind,
            author_id: author.into(),
            author_name: format!("name-{author}"),
            created_at: created,
            updated_at: Some(created),
            closed_at: None,
            title: String::new(),
            body: String::new(),
        }
    }

    fn comment(ticket_id: &str, author: &str, created: DateTime<Utc>) -> Comment {
        Comment {
            ticket_id: ticket_id.into(),
            author_id: author.into(),
            author_name: format!("name-{author}"),
            created_at: created,
            updated_at: Some(created),
            body: String::new(),
        }
    }

    #[test]
    fn counts_only_strictly_earlier_tickets_of_the_author() {
        let tickets = vec![
            ticket("1", TicketKind::PullRequest, "a", day(1)),
            ticket("2", TicketKind::PullRequest, "a", day(5)),
            ticket("3", TicketKind::Issue, "a", day(2)),
            ticket("4", TicketKind::PullRequest, "b", day(1)),
        ];
        let comments = vec![
            comment("1", "a", day(5)),
            comment("1", "a", day(6)),
            comment("4", "b", day(1)),
        ];
        let (c, _) = annotate_comments_tickets(comments, tickets, day(20));
        // ticket 2 is created at the same instant: not counted
        assert_eq!((c[0].num_pr_created, c[0].num_issue_created), (1, 1));
        assert_eq!((c[1].num_pr_created, c[1].num_issue_created), (2, 1));
        assert_eq!((c[2].num_pr_created, c[2].num_issue_created), (0, 0));
    }

    #[test]
    fn missing_author_id_matches_nothing() {
        let tickets = vec![ticket("1", TicketKind::Issue, "", day(1))];
        let comments = vec![comment("1", "", day(3))];
        let (c, _) = annotate_comments_tickets(comments, tickets, day(20));
        assert_eq!(c[0].num_issue_created, 0);
    }

    #[test]
    fn comment_order_follows_time_within_ticket() {
        let comments = vec![
            comment("1", "a", day(3)),
            comment("2", "a", day(1)),
            comment("1", "b", day(2)),
            comment("1", "c", day(4)),
        ];
        let (c, _) = annotate_comments_tickets(comments, Vec::new(), day(20));
        let orders: Vec<usize> = c.iter().map(|c| c.comment_order).collect();
        assert_eq!(orders, vec![1, 0, 0, 2]);
    }

    #[test]
    fn update_flags() {
        let mut edited = comment("1", "a", day(1));
        edited.updated_at = Some(day(2));
        let mut never = comment("1", "a", day(1));
        never.updated_at = None;
        let (c, _) = annotate_comments_tickets(
            vec![edited, comment("1", "a", day(1)), never],
            Vec::new(),
            day(20),
        );
        assert!(c[0].was_updated);
        assert!(!c[1].was_updated);
        assert!(!c[2].was_updated);
    }

    #[test]
    fn closed_flag_and_open_duration() {
        let mut closed = ticket("1", TicketKind::Issue, "a", day(1));
        closed.closed_at = Some(day(4));
        let open = ticket("2", TicketKind::Issue, "a", day(10));
        let sentinel = ticket(
            "3",
            TicketKind::Issue,
            "a",
            Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap(),
        );
        let (_, t) = annotate_comments_tickets(Vec::new(), vec![closed, open, sentinel], day(20));
        assert!(t[0].is_closed);
        assert_eq!(t[0].open_days(), Some(3));
        assert!(!t[1].is_closed);
        assert_eq!(t[1].open_days(), Some(10));
        assert_eq!(t[2].open_duration, None);
        assert!(t[0].num_tickets_opened.is_none());
    }

    #[test]
    fn running_counts_per_author() {
        let tickets = vec![
            ticket("1", TicketKind::Issue, "a", day(1)),
            ticket("2", TicketKind::PullRequest, "a", day(2)),
            ticket("3", TicketKind::Issue, "b", day(3)),
        ];
        let comments = vec![
            comment("1", "a", day(4)),
            comment("1", "b", day(4)),
            comment("2", "a", day(2)),
            comment("2", "a", day(5)),
        ];
        let (c, t) = annotate_logs(comments, tickets, day(20));
        let posted: Vec<Option<usize>> = c.iter().map(|c| c.num_comments_posted).collect();
        assert_eq!(posted, vec![Some(1), Some(0), Some(0), Some(2)]);
        let opened: Vec<Option<usize>> = t.iter().map(|t| t.num_tickets_opened).collect();
        assert_eq!(opened, vec![Some(0), Some(1), Some(0)]);
    }
}
