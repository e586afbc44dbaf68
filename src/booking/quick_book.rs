//! Two-step flow: pick a service, then the embedded scheduler.

use crate::catalog::{self, Category};

/// Scheduler account namespace; event slugs hang off it one per service id.
pub const SCHEDULER_NAMESPACE: &str = "lumiere-wax";

/// Scheduler event slug for a service. One-to-one with the service id.
pub fn scheduler_slug(service_id: &str) -> String {
    format!("{SCHEDULER_NAMESPACE}/{service_id}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuickBookState {
    ChooseService {
        category: Option<Category>,
        seeded: bool,
    },
    Scheduler {
        service_id: String,
        slug: String,
        seeded: bool,
    },
}

impl Default for QuickBookState {
    fn default() -> Self {
        Self::ChooseService {
            category: None,
            seeded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuickBookAction {
    SetCategory(Option<Category>),
    SelectService(String),
    /// First-render injection from a `?service=` URL parameter; jumps straight
    /// to the scheduler when the id resolves.
    SeedFromUrl(String),
    /// Back to service selection, clearing the current choice.
    ChangeService,
}

pub fn reduce(state: QuickBookState, action: QuickBookAction) -> QuickBookState {
    use QuickBookAction as A;
    use QuickBookState as S;

    match (state, action) {
        (S::ChooseService { seeded, .. }, A::SetCategory(category)) => {
            S::ChooseService { category, seeded }
        }
        (S::ChooseService { category, seeded }, A::SelectService(id)) => {
            match catalog::service_by_id(&id) {
                Some(_) => S::Scheduler {
                    slug: scheduler_slug(&id),
                    service_id: id,
                    seeded,
                },
                None => S::ChooseService { category, seeded },
            }
        }
        (S::ChooseService { category, seeded: false }, A::SeedFromUrl(id)) => {
            match catalog::service_by_id(&id) {
                // Seeding selects the service and skips straight to step 2.
                Some(_) => S::Scheduler {
                    slug: scheduler_slug(&id),
                    service_id: id,
                    seeded: true,
                },
                None => S::ChooseService { category, seeded: true },
            }
        }
        (S::Scheduler { seeded, .. }, A::ChangeService) => S::ChooseService {
            category: None,
            seeded,
        },
        (state, _) => state,
    }
}
