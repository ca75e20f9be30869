pub mod catalog_price_rule;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod pagination;
pub mod request;
pub mod types;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherBuilder, Handler, RegistrationError};
pub use error::{PaginationField, ValidationError};
pub use ids::{CatalogPriceRuleId, LanguageId, ShopId};
pub use pagination::Pagination;
pub use request::{Request, RequestKind};
