use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    FirebaseId,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Receipts {
    Table,
    Id,
    UserId,
    MerchantName,
    DateOfPurchase,
    TotalExpense,
    Category,
    ImageUrl,
    Items,
    ScanDate,
}

/// 预算 (分类以 JSON 内嵌, version 用于乐观并发控制)
#[derive(DeriveIden)]
enum Budgets {
    Table,
    Id,
    UserId,
    MonthYear,
    TotalBudget,
    TotalSpent,
    Categories,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserPoints {
    Table,
    Id,
    UserId,
    TotalPoints,
    AvailablePoints,
    SpentPoints,
    LastUpdated,
}

#[derive(DeriveIden)]
enum PointTransactions {
    Table,
    Id,
    UserId,
    Points,
    TransactionType,
    Source,
    ReferenceId,
    Description,
    TransactionDate,
}

#[derive(DeriveIden)]
enum Rewards {
    Table,
    Id,
    Name,
    Description,
    PointsCost,
    ImageUrl,
    Category,
    IsAvailable,
    Quantity,
    MerchantName,
    TermsConditions,
    ExpiryDate,
}

#[derive(DeriveIden)]
enum UserRewards {
    Table,
    Id,
    UserId,
    RewardId,
    RewardName,
    PointsSpent,
    RedeemedDate,
    Status,
    RedemptionCode,
    DeliveryInfo,
    ExpiryDate,
}

#[derive(DeriveIden)]
enum Promotions {
    Table,
    Id,
    Merchant,
    Description,
    Expiry,
    ImageUrl,
    Location,
    Code,
    Conditions,
    Category,
    PromotionId,
}

#[derive(DeriveIden)]
enum SavedPromotions {
    Table,
    Id,
    UserId,
    PromotionId,
    SavedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Users::FirebaseId).string_len(128).null())
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_email_unique")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_firebase_id_unique")
                    .table(Users::Table)
                    .col(Users::FirebaseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 小票表
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Receipts::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Receipts::UserId).string_len(128).null())
                    .col(
                        ColumnDef::new(Receipts::MerchantName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Receipts::DateOfPurchase)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Receipts::TotalExpense)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Receipts::Category).string_len(100).not_null())
                    .col(ColumnDef::new(Receipts::ImageUrl).text().null())
                    .col(ColumnDef::new(Receipts::Items).json_binary().null())
                    .col(
                        ColumnDef::new(Receipts::ScanDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_receipts_user_id")
                    .table(Receipts::Table)
                    .col(Receipts::UserId)
                    .to_owned(),
            )
            .await?;

        // 月度预算表
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Budgets::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Budgets::UserId).string_len(128).not_null())
                    .col(ColumnDef::new(Budgets::MonthYear).string_len(7).not_null())
                    .col(
                        ColumnDef::new(Budgets::TotalBudget)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Budgets::TotalSpent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Budgets::Categories).json_binary().not_null())
                    .col(
                        ColumnDef::new(Budgets::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Budgets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Budgets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // (user_id, month_year) 唯一：每个用户每月一条预算
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_budgets_user_month_unique")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::MonthYear)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 积分账户
        manager
            .create_table(
                Table::create()
                    .table(UserPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserPoints::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserPoints::UserId).string_len(128).not_null())
                    .col(
                        ColumnDef::new(UserPoints::TotalPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserPoints::AvailablePoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserPoints::SpentPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserPoints::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_points_user_unique")
                    .table(UserPoints::Table)
                    .col(UserPoints::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 积分流水 (只追加)
        manager
            .create_table(
                Table::create()
                    .table(PointTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointTransactions::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::UserId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::Points)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::TransactionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::ReferenceId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PointTransactions::Description).text().not_null())
                    .col(
                        ColumnDef::new(PointTransactions::TransactionDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_point_transactions_user_date")
                    .table(PointTransactions::Table)
                    .col(PointTransactions::UserId)
                    .col(PointTransactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        // 奖励目录
        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rewards::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rewards::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Rewards::Description).text().not_null())
                    .col(ColumnDef::new(Rewards::PointsCost).big_integer().not_null())
                    .col(ColumnDef::new(Rewards::ImageUrl).text().null())
                    .col(ColumnDef::new(Rewards::Category).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Rewards::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Rewards::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Rewards::MerchantName).string_len(255).null())
                    .col(ColumnDef::new(Rewards::TermsConditions).text().null())
                    .col(
                        ColumnDef::new(Rewards::ExpiryDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 兑换记录
        manager
            .create_table(
                Table::create()
                    .table(UserRewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserRewards::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserRewards::UserId).string_len(128).not_null())
                    .col(ColumnDef::new(UserRewards::RewardId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(UserRewards::RewardName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserRewards::PointsSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserRewards::RedeemedDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(ColumnDef::new(UserRewards::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(UserRewards::RedemptionCode)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(UserRewards::DeliveryInfo).text().null())
                    .col(
                        ColumnDef::new(UserRewards::ExpiryDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_rewards_user_id")
                    .table(UserRewards::Table)
                    .col(UserRewards::UserId)
                    .to_owned(),
            )
            .await?;

        // 优惠活动
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promotions::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promotions::Merchant).string_len(255).not_null())
                    .col(ColumnDef::new(Promotions::Description).text().not_null())
                    .col(ColumnDef::new(Promotions::Expiry).string_len(32).not_null())
                    .col(ColumnDef::new(Promotions::ImageUrl).text().null())
                    .col(ColumnDef::new(Promotions::Location).string_len(255).null())
                    .col(ColumnDef::new(Promotions::Code).string_len(64).null())
                    .col(ColumnDef::new(Promotions::Conditions).text().null())
                    .col(ColumnDef::new(Promotions::Category).string_len(100).not_null())
                    .col(ColumnDef::new(Promotions::PromotionId).integer().null())
                    .to_owned(),
            )
            .await?;

        // 用户收藏的优惠
        manager
            .create_table(
                Table::create()
                    .table(SavedPromotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SavedPromotions::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SavedPromotions::UserId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SavedPromotions::PromotionId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SavedPromotions::SavedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_saved_promotions_user_promotion_unique")
                    .table(SavedPromotions::Table)
                    .col(SavedPromotions::UserId)
                    .col(SavedPromotions::PromotionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SavedPromotions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserRewards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rewards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PointTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserPoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
