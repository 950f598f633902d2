pub mod customer;
pub mod order;

pub use customer::{
    ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
};
pub use order::{
    ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel, OrderStatus,
};
