use crate::models::{StudentDetail, StudentSummary};
use crate::ui::client::StudentApi;

/// Which view is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    StudentList,
    Registration,
    StudentCard,
}

/// State behind the three views. Owned by the caller and passed down; data is
/// re-fetched on every navigation.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    pub current_page: Page,
    pub students: Vec<StudentSummary>,
    pub selected_id: Option<i64>,
    pub student: Option<StudentDetail>,
    pub notice: Option<String>,
}

impl ViewModel {
    /// Switch page; anything fetched for the previous page is dropped
    pub fn navigate(self, page: Page, selected_id: Option<i64>) -> Self {
        let selected_id = match page {
            Page::StudentCard => selected_id,
            _ => None,
        };
        Self {
            current_page: page,
            selected_id,
            ..Self::default()
        }
    }

    /// Fetch what the current page shows. A card that cannot be loaded sends
    /// the user back to the list with a notice.
    pub async fn load<A: StudentApi + ?Sized>(&mut self, api: &A) {
        match self.current_page {
            Page::StudentList => self.load_list(api).await,
            Page::Registration => {}
            Page::StudentCard => {
                let result = match self.selected_id {
                    Some(id) => api.get(id).await.map_err(|e| {
                        tracing::warn!(status = ?e.status(), "Error loading student {}: {}", id, e);
                        e.to_string()
                    }),
                    None => Err("No student selected".to_string()),
                };
                match result {
                    Ok(student) => self.student = Some(student),
                    Err(message) => {
                        *self = std::mem::take(self).navigate(Page::StudentList, None);
                        self.notice = Some(message);
                        self.load_list(api).await;
                    }
                }
            }
        }
    }

    async fn load_list<A: StudentApi + ?Sized>(&mut self, api: &A) {
        match api.list().await {
            Ok(students) => self.students = students,
            Err(e) => {
                tracing::error!("Error loading students: {}", e);
                self.students = Vec::new();
                self.notice = Some("Failed to fetch students".to_string());
            }
        }
    }
}
