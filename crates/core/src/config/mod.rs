pub mod pipeline_settings;
