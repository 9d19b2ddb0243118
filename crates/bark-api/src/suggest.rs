//! Second-degree follow suggestions.
//!
//! Pure list-diffing over a pre-loaded snapshot of the follow graph, so
//! the algorithm can be tested without a database. Output order: first
//! by the caller's following list, then by each introducer's own list;
//! the fallbacks iterate users in store order.

/// One user's slice of the follow graph.
#[derive(Debug, Clone)]
pub struct GraphUser {
    pub id: String,
    pub username: String,
    pub following: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub user_id: String,
    /// Username of the first-degree contact that introduced this
    /// candidate. None on the fallback paths.
    pub followed_by: Option<String>,
}

/// `users` is every user in store order, the caller included.
pub fn suggest(caller_id: &str, users: &[GraphUser]) -> Vec<Suggestion> {
    let Some(caller) = users.iter().find(|u| u.id == caller_id) else {
        return vec![];
    };
    let f1 = &caller.following;

    // Nobody followed yet: suggest everyone else, unannotated.
    if f1.is_empty() {
        return users
            .iter()
            .filter(|u| u.id != caller_id)
            .map(|u| Suggestion {
                user_id: u.id.clone(),
                followed_by: None,
            })
            .collect();
    }

    // Walk each first-degree contact's own follows. The seen list starts
    // as F1, so direct follows are never re-suggested and the first
    // introducer wins on duplicates.
    let mut seen: Vec<&str> = f1.iter().map(String::as_str).collect();
    let mut suggestions = Vec::new();

    for introducer_id in f1 {
        let Some(introducer) = users.iter().find(|u| &u.id == introducer_id) else {
            // Dangling follow edge; nothing to walk.
            continue;
        };
        for candidate_id in &introducer.following {
            if candidate_id == caller_id || seen.contains(&candidate_id.as_str()) {
                continue;
            }
            seen.push(candidate_id.as_str());
            suggestions.push(Suggestion {
                user_id: candidate_id.clone(),
                followed_by: Some(introducer.username.clone()),
            });
        }
    }

    if suggestions.is_empty() {
        // Second degree added nothing: fall back to everyone not yet
        // followed, unannotated.
        return users
            .iter()
            .filter(|u| u.id != caller_id && !f1.contains(&u.id))
            .map(|u| Suggestion {
                user_id: u.id.clone(),
                followed_by: None,
            })
            .collect();
    }

    suggestions
}
