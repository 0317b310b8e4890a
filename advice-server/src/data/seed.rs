use chrono::{Duration, Utc};

use crate::domain::advice::{Advice, Category};
use crate::domain::error::DomainError;
use crate::domain::user::{Role, User};
use crate::infrastructure::security::PasswordHasher;

pub const DEMO_PASSWORD: &str = "password";

/// Demo users and advice for the in-memory backend. Both accounts use
/// [`DEMO_PASSWORD`].
pub fn demo_snapshot(hasher: &PasswordHasher) -> Result<(Vec<User>, Vec<Advice>), DomainError> {
    let mut users = Vec::with_capacity(2);
    for (name, email, role) in [
        ("Test user", "test@example.com", Role::User),
        ("Administrator", "admin@example.com", Role::Admin),
    ] {
        let (hash, salt) = hasher
            .hash(DEMO_PASSWORD)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        users.push(User::new(name.into(), email.into(), hash, salt, role));
    }
    let admin_id = users[1].id;
    let user_id = users[0].id;

    let now = Utc::now();
    let entries = [
        (
            Category::Psychology,
            "How do I cope with stress?",
            "Exercise regularly, practise meditation and make sure you get enough sleep.",
            admin_id,
        ),
        (
            Category::Study,
            "How can I memorise information more effectively?",
            "Use spaced repetition, build associations and visualise what you learn.",
            admin_id,
        ),
        (
            Category::Life,
            "How should I plan my day?",
            "Write a task list, set priorities and leave time for rest and recovery.",
            user_id,
        ),
    ];
    let total = entries.len();
    let advices = entries
        .into_iter()
        .enumerate()
        .map(|(i, (category, question, answer, author))| {
            let mut advice = Advice::new(category, question.into(), answer.into(), Some(author));
            advice.created_at = now - Duration::minutes((total - i) as i64);
            advice
        })
        .collect();

    Ok((users, advices))
}
