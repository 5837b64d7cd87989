pub mod bonus;
pub mod conversion;
pub mod partner;
pub mod payment;

pub use bonus::{BonusStatus, ForecastBonus};
pub use conversion::{ConversionResponseBody, ConversionResult, TopUpLimits};
pub use partner::{PartnerAddress, PartnerRole};
pub use payment::{
    ActionKind, PaymentAction, PaymentInfoModel, PaymentMethodData, PaymentModel, PaymentRequest,
    TransactionResponse, TransactionStatus,
};
