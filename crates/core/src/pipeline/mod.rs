pub mod extract_faces_use_case;
pub mod identify_faces_use_case;
pub mod process_video_use_case;
pub mod report;
