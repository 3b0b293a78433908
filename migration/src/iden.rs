use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Role,
    Phone,
    Address,
    IsVerified,
    VerificationToken,
    ResetPasswordToken,
    ResetPasswordExpires,
}

#[derive(DeriveIden)]
pub enum Orphanages {
    Table,
    Id,
    Name,
    Description,
    Location,
    Address,
    Phone,
    Email,
    ContactPersonId,
    VerificationStatus,
}

#[derive(DeriveIden)]
pub enum Orphans {
    Table,
    Id,
    FirstName,
    LastName,
    Dob,
    Gender,
    OrphanageId,
    HealthStatus,
    EducationStatus,
    BackgroundStory,
    IsSponsored,
}

#[derive(DeriveIden)]
pub enum OrphanUpdates {
    Table,
    Id,
    OrphanId,
    UpdateType,
    Title,
    Description,
    CreatedBy,
}

#[derive(DeriveIden)]
pub enum Reviews {
    Table,
    Id,
    UserId,
    OrphanageId,
    Rating,
    Comment,
}

#[derive(DeriveIden)]
pub enum Campaigns {
    Table,
    Id,
    Title,
    Description,
    TargetAmount,
    CurrentAmount,
    StartDate,
    EndDate,
    Status,
    OrphanageId,
    CreatedBy,
}

#[derive(DeriveIden)]
pub enum Sponsorships {
    Table,
    Id,
    SponsorId,
    OrphanId,
    MonthlyAmount,
    StartDate,
    EndDate,
    Status,
    PaymentFrequency,
    LastPaymentDate,
    NextPaymentDate,
    TotalPaid,
    PaymentCount,
}

#[derive(DeriveIden)]
pub enum Donations {
    Table,
    Id,
    DonorId,
    Amount,
    DonationType,
    Category,
    Status,
    PaymentMethod,
    TransactionId,
    OrphanId,
    OrphanageId,
    CampaignId,
    SponsorshipId,
    Description,
    IsAnonymous,
    ReceiptUrl,
}

#[derive(DeriveIden)]
pub enum DeliveryTracking {
    Table,
    Id,
    DonationId,
    Status,
    PickupAddress,
    DeliveryAddress,
    Carrier,
    TrackingNumber,
    EstimatedDelivery,
    ActualDelivery,
    Notes,
}

#[derive(DeriveIden)]
pub enum DeliveryStatusHistory {
    Table,
    Id,
    DeliveryId,
    Status,
    ChangedBy,
}

#[derive(DeriveIden)]
pub enum VolunteerOpportunities {
    Table,
    Id,
    OrphanageId,
    Title,
    Description,
    RequiredSkills,
    VolunteersNeeded,
    StartDate,
    EndDate,
    Status,
    CreatedBy,
}

#[derive(DeriveIden)]
pub enum VolunteerApplications {
    Table,
    Id,
    VolunteerId,
    OpportunityId,
    Message,
    ResumeUrl,
    Status,
}

#[derive(DeriveIden)]
pub enum Notifications {
    Table,
    Id,
    UserId,
    Title,
    Message,
    NotificationType,
    RelatedId,
    IsRead,
}
