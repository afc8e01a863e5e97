pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod session_params;
}

pub mod video {
    pub mod domain {
        pub mod encoder_backend;
        pub mod frame_sink;
        pub mod frame_source;
        pub mod sink_error;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod encode_frames_use_case;
    pub mod pipeline_logger;
}
