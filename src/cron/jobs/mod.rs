pub mod detection_cycle;
