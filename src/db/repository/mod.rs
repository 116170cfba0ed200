pub mod adherence;
pub mod ai_interaction;
pub mod appointment;
pub mod device_token;
pub mod happy_memory;
pub mod mood_entry;
pub mod notification_queue_repository;
pub mod password_reset;
pub mod psychologist;
pub mod recommendation;
pub mod user;
pub mod user_settings;

pub use adherence::AdherenceRepository;
pub use ai_interaction::AiInteractionRepository;
pub use appointment::AppointmentRepository;
pub use device_token::DeviceTokenRepository;
pub use happy_memory::HappyMemoryRepository;
pub use mood_entry::MoodEntryRepository;
pub use notification_queue_repository::NotificationQueueRepository;
pub use password_reset::PasswordResetRepository;
pub use psychologist::PsychologistRepository;
pub use recommendation::RecommendationRepository;
pub use user::UserRepository;
pub use user_settings::UserSettingsRepository;
