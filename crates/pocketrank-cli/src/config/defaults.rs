pub struct DefaultsConfig {
    // preprocess
    pub preprocess_workers: usize,
    pub num_conformers: usize,
    pub max_iterations: usize,
    // train
    pub lr: f64,
    pub lr_decay: f64,
    pub weight_decay: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub train_workers: usize,
    pub ngpu: usize,
    pub loss2_ratio: f64,
    pub train_output: String,
    pub test_output: String,
    pub key_dir: String,
    pub dim_gnn: usize,
    pub n_gnn: usize,
    pub filter_spacing: f64,
    pub filter_gamma: f64,
    pub dropout: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            preprocess_workers: 4,
            num_conformers: 20,
            max_iterations: 200,
            lr: 1e-4,
            lr_decay: 1.0,
            weight_decay: 0.0,
            epochs: 10000,
            batch_size: 1,
            train_workers: 7,
            ngpu: 1,
            loss2_ratio: 1.0,
            train_output: "train.txt".to_string(),
            test_output: "test.txt".to_string(),
            key_dir: "keys".to_string(),
            dim_gnn: 32,
            n_gnn: 3,
            filter_spacing: 0.1,
            filter_gamma: 10.0,
            dropout: 0.0,
        }
    }
}
