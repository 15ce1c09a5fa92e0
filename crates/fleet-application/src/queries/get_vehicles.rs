//! Paged vehicle listing with license-plate search.

use async_trait::async_trait;
use tenancy_core::{DecoratorKind, DomainError, EntityQuery, ExecutionScope, Query, QueryHandler};
use tenancy_shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use tenancy_shared::{PagedResult, Pagination};
use validator::Validate;

use crate::domain::{Vehicle, VehicleDto};

#[derive(Debug, Clone, Validate)]
pub struct GetVehicles {
    /// Case-insensitive substring of the license plate.
    #[validate(length(max = 20, message = "Search text must be at most 20 characters"))]
    pub search_text: Option<String>,

    #[validate(range(min = 1, message = "Page number must be at least 1"))]
    pub page: u32,

    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub page_size: u32,
}

impl Default for GetVehicles {
    fn default() -> Self {
        Self {
            search_text: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl GetVehicles {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size.min(MAX_PAGE_SIZE);
        self
    }
}

impl Query for GetVehicles {
    const NAME: &'static str = "GetVehicles";
    type Output = PagedResult<VehicleDto>;
}

pub struct GetVehiclesHandler;

#[async_trait]
impl QueryHandler<GetVehicles> for GetVehiclesHandler {
    async fn handle(&self, query: GetVehicles, scope: &mut ExecutionScope) -> Result<PagedResult<VehicleDto>, DomainError> {
        let mut request = EntityQuery::new().paginate(Pagination::new(query.page, query.page_size));
        if let Some(text) = query.search_text {
            request = request.search("license_plate", text);
        }

        let page = scope.uow().shard().await?.query::<Vehicle>(request).await?;
        Ok(PagedResult {
            items: page.items.into_iter().map(VehicleDto::from).collect(),
            total_count: page.total_count,
            page: page.page,
            per_page: page.per_page,
        })
    }

    fn decorators() -> &'static [DecoratorKind] {
        &[DecoratorKind::Logging, DecoratorKind::Validation]
    }
}
