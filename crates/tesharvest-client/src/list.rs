use tracing::{debug, info, instrument};

use crate::client::TesClient;
use crate::error::{ClientError, ListingError};
use crate::types::{ListTasksResponse, TaskState};

impl TesClient {
  /// Page through the task listing and collect the ids of COMPLETE tasks.
  ///
  /// Ids keep the order the TES returned them in, page by page. Paging stops
  /// at the first response without a `next_page_token`.
  #[instrument(name = "list_complete_tasks", skip(self), fields(base_url = %self.base_url()))]
  pub async fn list_complete_task_ids(&self) -> Result<Vec<String>, ListingError> {
    let mut ids = Vec::new();
    let mut token = String::new();
    let mut pages = 0;

    loop {
      if pages >= self.max_pages() {
        return Err(ListingError {
          partial_ids: ids,
          pages,
          source: ClientError::TooManyPages {
            max_pages: self.max_pages(),
          },
        });
      }

      let page = match self.list_page(&token).await {
        Ok(page) => page,
        Err(source) => {
          return Err(ListingError {
            partial_ids: ids,
            pages,
            source,
          });
        }
      };
      pages += 1;

      let total = page.tasks.len();
      let before = ids.len();
      ids.extend(
        page
          .tasks
          .into_iter()
          .filter(|t| t.state == TaskState::Complete)
          .map(|t| t.id),
      );
      debug!(
        page = pages,
        tasks = total,
        complete = ids.len() - before,
        "listed task page"
      );

      match page.next_page_token {
        Some(next) if !next.is_empty() => token = next,
        _ => break,
      }
    }

    info!(pages, complete = ids.len(), "task listing finished");
    Ok(ids)
  }

  async fn list_page(&self, token: &str) -> Result<ListTasksResponse, ClientError> {
    let response = self.get(self.base_url(), &[("page_token", token)]).await?;
    self.read_json(response).await
  }
}
