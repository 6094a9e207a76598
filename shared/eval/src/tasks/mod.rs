mod bmne;

pub use bmne::{
    choice_prompt, filter_documents_by, normalize, normalize_all, Category, CategoryFilter,
    GENERATION_GOLD, LIKELIHOOD_GOLD,
};
