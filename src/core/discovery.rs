use chrono::{Months, NaiveDate};
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{Gender, User, UserParameters};

/// Sort key for discovery results, always descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserOrder {
    #[default]
    LastActive,
    Created,
}

impl UserOrder {
    /// `"created"` sorts by creation time, anything else by last activity
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some("created") => UserOrder::Created,
            _ => UserOrder::LastActive,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            UserOrder::LastActive => "last_active",
            UserOrder::Created => "created",
        }
    }
}

/// Inclusive date-of-birth bounds for an age range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthDateWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl BirthDateWindow {
    /// Users born in this window are between `min_age` and `max_age`
    /// years old on `today`
    ///
    /// The lower edge `today - (max_age + 1) years` itself is excluded:
    /// someone born on it has already turned `max_age + 1`.
    pub fn for_ages(min_age: u32, max_age: u32, today: NaiveDate) -> Self {
        let earliest = years_before(today, max_age.saturating_add(1))
            .succ_opt()
            .unwrap_or(NaiveDate::MIN);
        let latest = years_before(today, min_age);

        Self { earliest, latest }
    }

    pub fn contains(&self, date_of_birth: NaiveDate) -> bool {
        date_of_birth >= self.earliest && date_of_birth <= self.latest
    }
}

fn years_before(day: NaiveDate, years: u32) -> NaiveDate {
    day.checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Composed discovery filter for one requester
///
/// Filters apply in a fixed order: exclude self, exact gender, likers,
/// likees, birth date window. The same composition drives both the
/// in-memory predicate and the SQL the PostgreSQL store runs.
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuery {
    pub requester_id: i32,
    pub gender: Gender,
    pub liker_ids: Option<HashSet<i32>>,
    pub likee_ids: Option<HashSet<i32>>,
    pub birth_dates: Option<BirthDateWindow>,
    pub order: UserOrder,
}

impl UserQuery {
    pub fn new(requester_id: i32, gender: Gender) -> Self {
        Self {
            requester_id,
            gender,
            liker_ids: None,
            likee_ids: None,
            birth_dates: None,
            order: UserOrder::default(),
        }
    }

    /// Apply the age range and ordering carried by the parameters
    ///
    /// Like filters are not resolved here; the caller looks up both
    /// directions and attaches them with `with_likers`/`with_likees`.
    pub fn from_parameters(
        requester_id: i32,
        gender: Gender,
        params: &UserParameters,
        today: NaiveDate,
    ) -> Self {
        let mut query = Self::new(requester_id, gender).ordered_by(params.order_by.as_deref());
        if params.has_age_filter() {
            query = query.with_age_range(params.min_age, params.max_age, today);
        }
        query
    }

    /// Restrict to users who like the requester
    pub fn with_likers(mut self, ids: HashSet<i32>) -> Self {
        self.liker_ids = Some(ids);
        self
    }

    /// Restrict to users the requester likes
    pub fn with_likees(mut self, ids: HashSet<i32>) -> Self {
        self.likee_ids = Some(ids);
        self
    }

    pub fn with_age_range(mut self, min_age: u32, max_age: u32, today: NaiveDate) -> Self {
        self.birth_dates = Some(BirthDateWindow::for_ages(min_age, max_age, today));
        self
    }

    pub fn ordered_by(mut self, key: Option<&str>) -> Self {
        self.order = UserOrder::from_key(key);
        self
    }

    pub fn admits(&self, user: &User) -> bool {
        if user.id == self.requester_id {
            return false;
        }

        if user.gender != self.gender.as_str() {
            return false;
        }

        if let Some(likers) = &self.liker_ids {
            if !likers.contains(&user.id) {
                return false;
            }
        }

        if let Some(likees) = &self.likee_ids {
            if !likees.contains(&user.id) {
                return false;
            }
        }

        match &self.birth_dates {
            Some(window) => window.contains(user.date_of_birth),
            None => true,
        }
    }

    /// Descending by the order key; equal keys compare equal so a
    /// stable sort keeps storage order
    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        match self.order {
            UserOrder::LastActive => b.last_active.cmp(&a.last_active),
            UserOrder::Created => b.created.cmp(&a.created),
        }
    }

    /// Filter and order an in-memory candidate set
    pub fn apply<I>(&self, users: I) -> Vec<User>
    where
        I: IntoIterator<Item = User>,
    {
        let mut matched: Vec<User> = users.into_iter().filter(|u| self.admits(u)).collect();
        matched.sort_by(|a, b| self.compare(a, b));
        matched
    }

    /// Append the WHERE clause for this query
    pub fn push_filters(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE id <> ").push_bind(self.requester_id);
        qb.push(" AND gender = ").push_bind(self.gender.as_str());

        if let Some(likers) = &self.liker_ids {
            qb.push(" AND id = ANY(")
                .push_bind(sorted_ids(likers))
                .push(")");
        }

        if let Some(likees) = &self.likee_ids {
            qb.push(" AND id = ANY(")
                .push_bind(sorted_ids(likees))
                .push(")");
        }

        if let Some(window) = &self.birth_dates {
            qb.push(" AND date_of_birth >= ")
                .push_bind(window.earliest)
                .push(" AND date_of_birth <= ")
                .push_bind(window.latest);
        }
    }

    /// Append the ORDER BY clause; `id` stands in for storage order on ties
    pub fn push_order(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" ORDER BY ")
            .push(self.order.column())
            .push(" DESC, id ASC");
    }
}

fn sorted_ids(ids: &HashSet<i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = ids.iter().copied().collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    fn create_user(id: i32, gender: &str, dob: NaiveDate) -> User {
        User {
            id,
            username: format!("user{}", id),
            known_as: format!("User {}", id),
            gender: gender.to_string(),
            date_of_birth: dob,
            created: at(1),
            last_active: at(1),
            introduction: None,
            looking_for: None,
            interests: None,
            city: None,
            country: None,
            photos: vec![],
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_order_key_defaults_to_last_active() {
        assert_eq!(UserOrder::from_key(Some("created")), UserOrder::Created);
        assert_eq!(UserOrder::from_key(Some("lastActive")), UserOrder::LastActive);
        assert_eq!(UserOrder::from_key(None), UserOrder::LastActive);
    }

    #[test]
    fn test_birth_date_window_bounds() {
        let today = ymd(2024, 6, 15);
        let window = BirthDateWindow::for_ages(20, 20, today);

        assert_eq!(window.latest, ymd(2004, 6, 15));
        assert_eq!(window.earliest, ymd(2003, 6, 16));
        assert!(!window.contains(ymd(2003, 6, 15)));
        assert!(window.contains(ymd(2003, 6, 16)));
        assert!(!window.contains(ymd(2004, 6, 16)));
    }

    #[test]
    fn test_window_admits_only_matching_ages() {
        let today = ymd(2024, 6, 15);
        let query = UserQuery::new(99, Gender::Female).with_age_range(25, 30, today);

        for year in 1985..2010 {
            for (m, d) in [(1, 1), (6, 14), (6, 15), (6, 16), (12, 31)] {
                let user = create_user(1, "female", ymd(year, m, d));
                let age = user.age_on(today);
                assert_eq!(query.admits(&user), (25..=30).contains(&age), "dob {}", user.date_of_birth);
            }
        }
    }

    #[test]
    fn test_excludes_requester_and_other_gender() {
        let query = UserQuery::new(1, Gender::Female);

        assert!(!query.admits(&create_user(1, "female", ymd(1995, 1, 1))));
        assert!(!query.admits(&create_user(2, "male", ymd(1995, 1, 1))));
        assert!(query.admits(&create_user(3, "female", ymd(1995, 1, 1))));
    }

    #[test]
    fn test_like_sets_narrow_independently() {
        let query = UserQuery::new(1, Gender::Female)
            .with_likers(HashSet::from([2, 3]))
            .with_likees(HashSet::from([3, 4]));

        assert!(!query.admits(&create_user(2, "female", ymd(1995, 1, 1))));
        assert!(query.admits(&create_user(3, "female", ymd(1995, 1, 1))));
        assert!(!query.admits(&create_user(4, "female", ymd(1995, 1, 1))));
    }

    #[test]
    fn test_apply_sorts_descending_and_keeps_ties_stable() {
        let mut a = create_user(2, "female", ymd(1995, 1, 1));
        let mut b = create_user(3, "female", ymd(1995, 1, 1));
        let mut c = create_user(4, "female", ymd(1995, 1, 1));
        a.last_active = at(5);
        b.last_active = at(9);
        c.last_active = at(5);
        c.created = at(20);

        let ids: Vec<i32> = UserQuery::new(1, Gender::Female)
            .apply(vec![a.clone(), b.clone(), c.clone()])
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 4]);

        let ids: Vec<i32> = UserQuery::new(1, Gender::Female)
            .ordered_by(Some("created"))
            .apply(vec![a, b, c])
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![4, 2, 3]);
    }

    #[test]
    fn test_sql_composition() {
        let query = UserQuery::new(7, Gender::Male)
            .with_likees(HashSet::from([1]))
            .with_age_range(20, 30, ymd(2024, 1, 1))
            .ordered_by(Some("created"));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM users");
        query.push_filters(&mut qb);
        query.push_order(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT id FROM users WHERE id <> $1 AND gender = $2 AND id = ANY($3) \
             AND date_of_birth >= $4 AND date_of_birth <= $5 ORDER BY created DESC, id ASC"
        );
    }
}
